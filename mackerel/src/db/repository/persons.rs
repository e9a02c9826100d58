use chrono::Utc;
use libsql::{params, Connection};

use super::parse_timestamp;
use crate::db::traits::PersonRow;
use crate::error::{MackerelError, Result};

pub struct PersonRepository;

impl PersonRepository {
    /// Every person whose tombstone pointer is unset.
    pub async fn list_live(conn: &Connection) -> Result<Vec<PersonRow>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, first_name, last_name, email, phone, address, created_at
                FROM persons
                WHERE merged_into_person_id IS NULL
                ORDER BY created_at ASC
                "#,
                (),
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(PersonRow {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                phone: row.get(4)?,
                address: row.get(5)?,
                created_at: parse_timestamp(&row.get::<String>(6)?),
            });
        }
        Ok(results)
    }

    /// Fold `dup_id` into `keep_id`: reassign every dependent record,
    /// backfill contact fields the kept person lacks, and set the
    /// tombstone pointer. The duplicate row is never deleted.
    ///
    /// Runs on the caller's connection so the caller can wrap it in the
    /// same transaction as the candidate's status flip.
    pub async fn merge(conn: &Connection, keep_id: &str, dup_id: &str) -> Result<()> {
        Self::ensure_live(conn, keep_id).await?;
        Self::ensure_live(conn, dup_id).await?;

        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE cats SET person_id = ?1 WHERE person_id = ?2",
            params![keep_id, dup_id],
        )
        .await?;
        conn.execute(
            "UPDATE requests SET person_id = ?1 WHERE person_id = ?2",
            params![keep_id, dup_id],
        )
        .await?;
        conn.execute(
            "UPDATE appointments SET person_id = ?1 WHERE person_id = ?2",
            params![keep_id, dup_id],
        )
        .await?;

        // Place relationships: the kept person may already be linked to the
        // same place, so move what moves cleanly and sweep the rest.
        conn.execute(
            "UPDATE OR IGNORE person_places SET person_id = ?1 WHERE person_id = ?2",
            params![keep_id, dup_id],
        )
        .await?;
        conn.execute(
            "DELETE FROM person_places WHERE person_id = ?1",
            params![dup_id],
        )
        .await?;

        conn.execute(
            r#"
            UPDATE persons SET
                email = COALESCE(email, (SELECT email FROM persons WHERE id = ?2)),
                phone = COALESCE(phone, (SELECT phone FROM persons WHERE id = ?2)),
                address = COALESCE(address, (SELECT address FROM persons WHERE id = ?2)),
                updated_at = ?3
            WHERE id = ?1
            "#,
            params![keep_id, dup_id, now.clone()],
        )
        .await?;

        conn.execute(
            "UPDATE persons SET merged_into_person_id = ?1, updated_at = ?3 WHERE id = ?2",
            params![keep_id, dup_id, now],
        )
        .await?;

        Ok(())
    }

    async fn ensure_live(conn: &Connection, id: &str) -> Result<()> {
        let mut rows = conn
            .query(
                "SELECT merged_into_person_id FROM persons WHERE id = ?1",
                params![id],
            )
            .await?;

        match rows.next().await? {
            None => Err(MackerelError::OracleWrite(format!(
                "person '{id}' does not exist"
            ))),
            Some(row) => match row.get::<Option<String>>(0)? {
                Some(target) => Err(MackerelError::OracleWrite(format!(
                    "person '{id}' is already merged into '{target}'"
                ))),
                None => Ok(()),
            },
        }
    }
}
