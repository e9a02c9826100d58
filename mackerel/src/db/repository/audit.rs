use libsql::{params, Connection};

use super::parse_timestamp;
use crate::error::Result;
use crate::models::{MergeDecision, ResolutionAction};

pub struct AuditRepository;

impl AuditRepository {
    pub async fn record(conn: &Connection, decision: &MergeDecision) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO resolution_log (id, composite_id, action, resolved_by, resolved_at, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                decision.id.clone(),
                decision.composite_id.clone(),
                decision.action.as_str(),
                decision.resolved_by.clone(),
                decision.resolved_at.to_rfc3339(),
                decision.notes.clone(),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn list_for(conn: &Connection, composite_id: &str) -> Result<Vec<MergeDecision>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, composite_id, action, resolved_by, resolved_at, notes
                FROM resolution_log
                WHERE composite_id = ?1
                ORDER BY resolved_at DESC
                "#,
                params![composite_id],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(MergeDecision {
                id: row.get(0)?,
                composite_id: row.get(1)?,
                action: row
                    .get::<String>(2)?
                    .parse()
                    .unwrap_or(ResolutionAction::Dismiss),
                resolved_by: row.get(3)?,
                resolved_at: parse_timestamp(&row.get::<String>(4)?),
                notes: row.get(5)?,
            });
        }
        Ok(results)
    }
}
