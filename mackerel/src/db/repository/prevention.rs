use chrono::Utc;
use libsql::{params, Connection};

use super::{oracle_write, parse_timestamp, read_snapshot, PersonRepository};
use crate::db::traits::PreventionEventRow;
use crate::error::{MackerelError, Result};
use crate::models::{CandidateStatus, ResolutionAction};

pub struct PreventionRepository;

impl PreventionRepository {
    /// Pending intake-prevention events with both persons live,
    /// oldest first.
    pub async fn fetch(
        conn: &Connection,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PreventionEventRow>> {
        let mut rows = conn
            .query(
                r#"
                SELECT e.id, e.name_similarity, e.address_exact, e.detected_at, e.status,
                       e.matched_person_id,
                       NULLIF(TRIM(COALESCE(mp.first_name, '') || ' ' || COALESCE(mp.last_name, '')), ''),
                       mp.email, mp.phone, mp.address,
                       (SELECT COUNT(*) FROM cats c WHERE c.person_id = e.matched_person_id),
                       (SELECT COUNT(*) FROM requests q WHERE q.person_id = e.matched_person_id),
                       e.incoming_person_id,
                       NULLIF(TRIM(COALESCE(ip.first_name, '') || ' ' || COALESCE(ip.last_name, '')), ''),
                       ip.email, ip.phone, ip.address,
                       (SELECT COUNT(*) FROM cats c WHERE c.person_id = e.incoming_person_id),
                       (SELECT COUNT(*) FROM requests q WHERE q.person_id = e.incoming_person_id)
                FROM prevention_events e
                JOIN persons mp ON mp.id = e.matched_person_id AND mp.merged_into_person_id IS NULL
                JOIN persons ip ON ip.id = e.incoming_person_id AND ip.merged_into_person_id IS NULL
                WHERE e.status = 'pending'
                ORDER BY e.detected_at ASC
                LIMIT ?1 OFFSET ?2
                "#,
                params![limit, offset],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(PreventionEventRow {
                id: row.get(0)?,
                name_similarity: row.get(1)?,
                address_exact: row.get::<i64>(2)? != 0,
                detected_at: parse_timestamp(&row.get::<String>(3)?),
                status: row
                    .get::<String>(4)?
                    .parse()
                    .unwrap_or(CandidateStatus::Pending),
                matched: read_snapshot(&row, 5, 6)?,
                incoming: read_snapshot(&row, 12, 13)?,
            });
        }
        Ok(results)
    }

    pub async fn pending_count(conn: &Connection) -> Result<u64> {
        let mut rows = conn
            .query(
                r#"
                SELECT COUNT(*)
                FROM prevention_events e
                WHERE e.status = 'pending'
                  AND EXISTS (SELECT 1 FROM persons p WHERE p.id = e.matched_person_id AND p.merged_into_person_id IS NULL)
                  AND EXISTS (SELECT 1 FROM persons p WHERE p.id = e.incoming_person_id AND p.merged_into_person_id IS NULL)
                "#,
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }

    /// The matched (pre-existing) person is kept; the incoming record is
    /// the duplicate folded into it on merge.
    pub async fn resolve(
        conn: &Connection,
        event_id: &str,
        action: ResolutionAction,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        let mut rows = conn
            .query(
                "SELECT matched_person_id, incoming_person_id, status FROM prevention_events WHERE id = ?1",
                params![event_id],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Err(MackerelError::InvalidCandidate(format!(
                "unknown prevention event '{event_id}'"
            )));
        };
        let matched_id: String = row.get(0)?;
        let incoming_id: String = row.get(1)?;
        let status: CandidateStatus = row.get::<String>(2)?.parse()?;
        if status.is_terminal() {
            return Err(MackerelError::AlreadyResolved(format!(
                "prevention event '{event_id}' is already {}",
                status.as_str()
            )));
        }

        let tx = conn.transaction().await?;
        let affected = tx
            .execute(
                r#"
                UPDATE prevention_events
                SET status = ?2, resolved_by = ?3, resolved_at = ?4, notes = ?5
                WHERE id = ?1 AND status = 'pending'
                "#,
                params![
                    event_id,
                    action.terminal_status().as_str(),
                    resolved_by,
                    Utc::now().to_rfc3339(),
                    notes.map(str::to_string),
                ],
            )
            .await?;
        if affected == 0 {
            return Err(MackerelError::AlreadyResolved(format!(
                "prevention event '{event_id}' was resolved concurrently"
            )));
        }

        if action == ResolutionAction::Merge {
            PersonRepository::merge(&tx, &matched_id, &incoming_id)
                .await
                .map_err(oracle_write)?;
        }

        tx.commit().await?;
        Ok(())
    }
}
