use chrono::Utc;
use libsql::{params, Connection};

use super::{oracle_write, parse_timestamp, read_snapshot, PersonRepository, PlaceRepository};
use crate::db::traits::{DedupCandidateRow, DetectedPair, TierCount};
use crate::error::{MackerelError, Result};
use crate::models::{CandidateStatus, EntityKind, ResolutionAction};

pub struct DedupRepository;

impl DedupRepository {
    /// Pending pairs with both endpoints live, oldest detection first.
    ///
    /// Tier 4 is excluded unconditionally: those collisions are queued by
    /// the prevention stream, and surfacing them here too would put the
    /// same physical collision in the queue twice. `tier = 0` means no
    /// tier filter.
    pub async fn fetch(
        conn: &Connection,
        tier: Option<u8>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DedupCandidateRow>> {
        let mut rows = conn
            .query(
                r#"
                SELECT * FROM (
                    SELECT d.left_id, d.right_id, d.entity, d.tier, d.name_similarity,
                           d.detected_at, d.status,
                           NULLIF(TRIM(COALESCE(lp.first_name, '') || ' ' || COALESCE(lp.last_name, '')), '') AS left_name,
                           lp.email AS left_email, lp.phone AS left_phone, lp.address AS left_address,
                           (SELECT COUNT(*) FROM cats c WHERE c.person_id = d.left_id) AS left_cats,
                           (SELECT COUNT(*) FROM requests q WHERE q.person_id = d.left_id) AS left_requests,
                           NULLIF(TRIM(COALESCE(rp.first_name, '') || ' ' || COALESCE(rp.last_name, '')), '') AS right_name,
                           rp.email AS right_email, rp.phone AS right_phone, rp.address AS right_address,
                           (SELECT COUNT(*) FROM cats c WHERE c.person_id = d.right_id) AS right_cats,
                           (SELECT COUNT(*) FROM requests q WHERE q.person_id = d.right_id) AS right_requests
                    FROM dedup_candidates d
                    JOIN persons lp ON lp.id = d.left_id AND lp.merged_into_person_id IS NULL
                    JOIN persons rp ON rp.id = d.right_id AND rp.merged_into_person_id IS NULL
                    WHERE d.status = 'pending' AND d.entity = 'person'
                      AND d.tier != 4 AND (?1 = 0 OR d.tier = ?1)

                    UNION ALL

                    SELECT d.left_id, d.right_id, d.entity, d.tier, d.name_similarity,
                           d.detected_at, d.status,
                           lpl.label, NULL, NULL, lpl.address,
                           (SELECT COUNT(*) FROM cats c WHERE c.place_id = d.left_id),
                           (SELECT COUNT(*) FROM requests q WHERE q.place_id = d.left_id),
                           rpl.label, NULL, NULL, rpl.address,
                           (SELECT COUNT(*) FROM cats c WHERE c.place_id = d.right_id),
                           (SELECT COUNT(*) FROM requests q WHERE q.place_id = d.right_id)
                    FROM dedup_candidates d
                    JOIN places lpl ON lpl.id = d.left_id AND lpl.merged_into_place_id IS NULL
                    JOIN places rpl ON rpl.id = d.right_id AND rpl.merged_into_place_id IS NULL
                    WHERE d.status = 'pending' AND d.entity = 'place'
                      AND d.tier != 4 AND (?1 = 0 OR d.tier = ?1)
                )
                ORDER BY detected_at ASC
                LIMIT ?2 OFFSET ?3
                "#,
                params![i64::from(tier.unwrap_or(0)), limit, offset],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_candidate(&row)?);
        }
        Ok(results)
    }

    /// Pending counts per tier, live endpoints only, pagination-independent.
    pub async fn stats(conn: &Connection) -> Result<Vec<TierCount>> {
        let mut rows = conn
            .query(
                r#"
                SELECT d.tier, COUNT(*)
                FROM dedup_candidates d
                WHERE d.status = 'pending' AND d.tier != 4
                  AND CASE d.entity
                        WHEN 'person' THEN
                            EXISTS (SELECT 1 FROM persons p WHERE p.id = d.left_id AND p.merged_into_person_id IS NULL)
                            AND EXISTS (SELECT 1 FROM persons p WHERE p.id = d.right_id AND p.merged_into_person_id IS NULL)
                        ELSE
                            EXISTS (SELECT 1 FROM places pl WHERE pl.id = d.left_id AND pl.merged_into_place_id IS NULL)
                            AND EXISTS (SELECT 1 FROM places pl WHERE pl.id = d.right_id AND pl.merged_into_place_id IS NULL)
                      END
                GROUP BY d.tier
                ORDER BY d.tier
                "#,
                (),
            )
            .await?;

        let mut counts = Vec::new();
        while let Some(row) = rows.next().await? {
            counts.push(TierCount {
                tier: row.get::<i64>(0)? as u8,
                count: row.get::<i64>(1)? as u64,
            });
        }
        Ok(counts)
    }

    /// First writer out of `pending` wins; everyone else gets
    /// `AlreadyResolved`. On merge, the dependent reassignment and the
    /// tombstone land in the same transaction as the status flip.
    pub async fn resolve(
        conn: &Connection,
        left_id: &str,
        right_id: &str,
        action: ResolutionAction,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        let mut rows = conn
            .query(
                "SELECT entity, status FROM dedup_candidates WHERE left_id = ?1 AND right_id = ?2",
                params![left_id, right_id],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Err(MackerelError::InvalidCandidate(format!(
                "unknown dedup candidate '{left_id}:{right_id}'"
            )));
        };
        let entity: EntityKind = row.get::<String>(0)?.parse()?;
        let status: CandidateStatus = row.get::<String>(1)?.parse()?;
        if status.is_terminal() {
            return Err(MackerelError::AlreadyResolved(format!(
                "dedup candidate '{left_id}:{right_id}' is already {}",
                status.as_str()
            )));
        }

        let tx = conn.transaction().await?;
        let affected = tx
            .execute(
                r#"
                UPDATE dedup_candidates
                SET status = ?3, resolved_by = ?4, resolved_at = ?5, notes = ?6
                WHERE left_id = ?1 AND right_id = ?2 AND status = 'pending'
                "#,
                params![
                    left_id,
                    right_id,
                    action.terminal_status().as_str(),
                    resolved_by,
                    Utc::now().to_rfc3339(),
                    notes.map(str::to_string),
                ],
            )
            .await?;
        if affected == 0 {
            return Err(MackerelError::AlreadyResolved(format!(
                "dedup candidate '{left_id}:{right_id}' was resolved concurrently"
            )));
        }

        if action == ResolutionAction::Merge {
            let merged = match entity {
                EntityKind::Person => PersonRepository::merge(&tx, left_id, right_id).await,
                EntityKind::Place => PlaceRepository::merge(&tx, left_id, right_id).await,
            };
            merged.map_err(oracle_write)?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Queue scan output. The pair key is the identity, so re-inserting an
    /// already-known pair is a no-op and the returned count only reflects
    /// genuinely new rows.
    pub async fn insert_batch(conn: &Connection, pairs: &[DetectedPair]) -> Result<u64> {
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0u64;

        for pair in pairs {
            inserted += conn
                .execute(
                    r#"
                    INSERT OR IGNORE INTO dedup_candidates (
                        left_id, right_id, entity, tier, name_similarity,
                        shared_email, shared_phone, detected_at, status
                    ) VALUES (?1, ?2, 'person', ?3, ?4, ?5, ?6, ?7, 'pending')
                    "#,
                    params![
                        pair.left_id.clone(),
                        pair.right_id.clone(),
                        i64::from(pair.tier),
                        pair.name_similarity,
                        pair.shared_email.clone(),
                        pair.shared_phone.clone(),
                        now.clone(),
                    ],
                )
                .await?;
        }

        Ok(inserted)
    }

    fn row_to_candidate(row: &libsql::Row) -> Result<DedupCandidateRow> {
        Ok(DedupCandidateRow {
            left: read_snapshot(row, 0, 7)?,
            right: read_snapshot(row, 1, 13)?,
            entity: row
                .get::<String>(2)?
                .parse()
                .unwrap_or(EntityKind::Person),
            tier: row.get::<i64>(3)? as u8,
            name_similarity: row.get(4)?,
            detected_at: parse_timestamp(&row.get::<String>(5)?),
            status: row
                .get::<String>(6)?
                .parse()
                .unwrap_or(CandidateStatus::Pending),
        })
    }
}
