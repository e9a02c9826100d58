use chrono::Utc;
use libsql::{params, Connection};

use crate::error::{MackerelError, Result};

pub struct PlaceRepository;

impl PlaceRepository {
    /// Place counterpart of [`super::PersonRepository::merge`]: reassign
    /// dependents, backfill what the kept place lacks, set the tombstone.
    pub async fn merge(conn: &Connection, keep_id: &str, dup_id: &str) -> Result<()> {
        Self::ensure_live(conn, keep_id).await?;
        Self::ensure_live(conn, dup_id).await?;

        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE cats SET place_id = ?1 WHERE place_id = ?2",
            params![keep_id, dup_id],
        )
        .await?;
        conn.execute(
            "UPDATE requests SET place_id = ?1 WHERE place_id = ?2",
            params![keep_id, dup_id],
        )
        .await?;

        conn.execute(
            "UPDATE OR IGNORE person_places SET place_id = ?1 WHERE place_id = ?2",
            params![keep_id, dup_id],
        )
        .await?;
        conn.execute(
            "DELETE FROM person_places WHERE place_id = ?1",
            params![dup_id],
        )
        .await?;

        conn.execute(
            r#"
            UPDATE places SET
                label = COALESCE(label, (SELECT label FROM places WHERE id = ?2)),
                address = COALESCE(address, (SELECT address FROM places WHERE id = ?2)),
                updated_at = ?3
            WHERE id = ?1
            "#,
            params![keep_id, dup_id, now.clone()],
        )
        .await?;

        conn.execute(
            "UPDATE places SET merged_into_place_id = ?1, updated_at = ?3 WHERE id = ?2",
            params![keep_id, dup_id, now],
        )
        .await?;

        Ok(())
    }

    async fn ensure_live(conn: &Connection, id: &str) -> Result<()> {
        let mut rows = conn
            .query(
                "SELECT merged_into_place_id FROM places WHERE id = ?1",
                params![id],
            )
            .await?;

        match rows.next().await? {
            None => Err(MackerelError::OracleWrite(format!(
                "place '{id}' does not exist"
            ))),
            Some(row) => match row.get::<Option<String>>(0)? {
                Some(target) => Err(MackerelError::OracleWrite(format!(
                    "place '{id}' is already merged into '{target}'"
                ))),
                None => Ok(()),
            },
        }
    }
}
