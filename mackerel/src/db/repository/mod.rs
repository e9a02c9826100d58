mod audit;
mod dedup;
mod engine;
mod persons;
mod places;
mod prevention;

pub use audit::AuditRepository;
pub use dedup::DedupRepository;
pub use engine::EngineRepository;
pub use persons::PersonRepository;
pub use places::PlaceRepository;
pub use prevention::PreventionRepository;

use chrono::{DateTime, Utc};

use crate::db::traits::PartySnapshot;
use crate::error::{MackerelError, Result};

/// Parse an RFC 3339 TEXT column, falling back to now on a corrupt value.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Read one side's denormalized display columns: the id at `id_idx`, then
/// name, email, phone, address, cat count, request count starting at `base`.
pub(crate) fn read_snapshot(row: &libsql::Row, id_idx: i32, base: i32) -> Result<PartySnapshot> {
    Ok(PartySnapshot {
        id: row.get(id_idx)?,
        name: row.get(base)?,
        email: row.get(base + 1)?,
        phone: row.get(base + 2)?,
        address: row.get(base + 3)?,
        cat_count: row.get(base + 4)?,
        request_count: row.get(base + 5)?,
    })
}

/// A merge that fails mid-transaction is an oracle write failure, not a
/// generic database error: the caller must see the underlying message and
/// must not blindly retry.
pub(crate) fn oracle_write(err: MackerelError) -> MackerelError {
    match err {
        MackerelError::Database(inner) => MackerelError::OracleWrite(inner.to_string()),
        other => other,
    }
}
