use chrono::Utc;
use libsql::{params, Connection};

use super::{oracle_write, parse_timestamp, read_snapshot, PersonRepository};
use crate::db::traits::EngineDecisionRow;
use crate::error::{MackerelError, Result};
use crate::models::CandidateStatus;

pub struct EngineRepository;

impl EngineRepository {
    /// Pending uncertain-match decisions with both persons live,
    /// oldest first.
    pub async fn fetch(
        conn: &Connection,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<EngineDecisionRow>> {
        let mut rows = conn
            .query(
                r#"
                SELECT d.id, d.match_probability, d.top_candidate_score, d.comparison_vector,
                       d.detected_at, d.status,
                       d.person_a_id,
                       NULLIF(TRIM(COALESCE(pa.first_name, '') || ' ' || COALESCE(pa.last_name, '')), ''),
                       pa.email, pa.phone, pa.address,
                       (SELECT COUNT(*) FROM cats c WHERE c.person_id = d.person_a_id),
                       (SELECT COUNT(*) FROM requests q WHERE q.person_id = d.person_a_id),
                       d.person_b_id,
                       NULLIF(TRIM(COALESCE(pb.first_name, '') || ' ' || COALESCE(pb.last_name, '')), ''),
                       pb.email, pb.phone, pb.address,
                       (SELECT COUNT(*) FROM cats c WHERE c.person_id = d.person_b_id),
                       (SELECT COUNT(*) FROM requests q WHERE q.person_id = d.person_b_id)
                FROM engine_decisions d
                JOIN persons pa ON pa.id = d.person_a_id AND pa.merged_into_person_id IS NULL
                JOIN persons pb ON pb.id = d.person_b_id AND pb.merged_into_person_id IS NULL
                WHERE d.status = 'pending'
                ORDER BY d.detected_at ASC
                LIMIT ?1 OFFSET ?2
                "#,
                params![limit, offset],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(EngineDecisionRow {
                id: row.get(0)?,
                match_probability: row.get(1)?,
                top_candidate_score: row.get(2)?,
                comparison_vector: row.get(3)?,
                detected_at: parse_timestamp(&row.get::<String>(4)?),
                status: native_status(&row.get::<String>(5)?),
                left: read_snapshot(&row, 6, 7)?,
                right: read_snapshot(&row, 13, 14)?,
            });
        }
        Ok(results)
    }

    pub async fn pending_count(conn: &Connection) -> Result<u64> {
        let mut rows = conn
            .query(
                r#"
                SELECT COUNT(*)
                FROM engine_decisions d
                WHERE d.status = 'pending'
                  AND EXISTS (SELECT 1 FROM persons p WHERE p.id = d.person_a_id AND p.merged_into_person_id IS NULL)
                  AND EXISTS (SELECT 1 FROM persons p WHERE p.id = d.person_b_id AND p.merged_into_person_id IS NULL)
                "#,
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }

    /// Resolve in the engine's native vocabulary: `merge`, `approve`
    /// (distinct people), or `reject` (not actionable). Person A is the
    /// kept side on merge.
    pub async fn resolve(
        conn: &Connection,
        decision_id: &str,
        native_action: &str,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        let new_status = match native_action {
            "merge" => "merged",
            "approve" => "approved",
            "reject" => "rejected",
            other => {
                return Err(MackerelError::InvalidAction(format!(
                    "unknown engine action '{other}'"
                )))
            }
        };

        let mut rows = conn
            .query(
                "SELECT person_a_id, person_b_id, status FROM engine_decisions WHERE id = ?1",
                params![decision_id],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Err(MackerelError::InvalidCandidate(format!(
                "unknown engine decision '{decision_id}'"
            )));
        };
        let person_a: String = row.get(0)?;
        let person_b: String = row.get(1)?;
        let status: String = row.get(2)?;
        if status != "pending" {
            return Err(MackerelError::AlreadyResolved(format!(
                "engine decision '{decision_id}' is already {status}"
            )));
        }

        let tx = conn.transaction().await?;
        let affected = tx
            .execute(
                r#"
                UPDATE engine_decisions
                SET status = ?2, resolved_by = ?3, resolved_at = ?4, notes = ?5
                WHERE id = ?1 AND status = 'pending'
                "#,
                params![
                    decision_id,
                    new_status,
                    resolved_by,
                    Utc::now().to_rfc3339(),
                    notes.map(str::to_string),
                ],
            )
            .await?;
        if affected == 0 {
            return Err(MackerelError::AlreadyResolved(format!(
                "engine decision '{decision_id}' was resolved concurrently"
            )));
        }

        if native_action == "merge" {
            PersonRepository::merge(&tx, &person_a, &person_b)
                .await
                .map_err(oracle_write)?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Engine-native status strings mapped onto the unified lifecycle.
fn native_status(raw: &str) -> CandidateStatus {
    match raw {
        "approved" => CandidateStatus::KeptSeparate,
        "rejected" => CandidateStatus::Dismissed,
        "merged" => CandidateStatus::Merged,
        _ => CandidateStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_status_maps_onto_unified_lifecycle() {
        assert_eq!(native_status("pending"), CandidateStatus::Pending);
        assert_eq!(native_status("approved"), CandidateStatus::KeptSeparate);
        assert_eq!(native_status("rejected"), CandidateStatus::Dismissed);
        assert_eq!(native_status("merged"), CandidateStatus::Merged);
    }
}
