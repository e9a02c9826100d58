use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- People table. merged_into_person_id is the tombstone pointer:
        -- once set, the row is a duplicate and must never surface as a
        -- live record, but it stays addressable for history.
        CREATE TABLE IF NOT EXISTS persons (
            id TEXT PRIMARY KEY,
            first_name TEXT,
            last_name TEXT,
            email TEXT,
            phone TEXT,
            address TEXT,
            city TEXT,
            merged_into_person_id TEXT REFERENCES persons(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_persons_email ON persons(email);
        CREATE INDEX IF NOT EXISTS idx_persons_phone ON persons(phone);
        CREATE INDEX IF NOT EXISTS idx_persons_merged_into ON persons(merged_into_person_id);

        -- Colony sites and other locations.
        CREATE TABLE IF NOT EXISTS places (
            id TEXT PRIMARY KEY,
            label TEXT,
            address TEXT,
            city TEXT,
            merged_into_place_id TEXT REFERENCES places(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_places_merged_into ON places(merged_into_place_id);

        CREATE TABLE IF NOT EXISTS cats (
            id TEXT PRIMARY KEY,
            name TEXT,
            person_id TEXT REFERENCES persons(id),
            place_id TEXT REFERENCES places(id),
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cats_person_id ON cats(person_id);
        CREATE INDEX IF NOT EXISTS idx_cats_place_id ON cats(place_id);

        CREATE TABLE IF NOT EXISTS requests (
            id TEXT PRIMARY KEY,
            person_id TEXT REFERENCES persons(id),
            place_id TEXT REFERENCES places(id),
            summary TEXT,
            status TEXT NOT NULL DEFAULT 'open',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_requests_person_id ON requests(person_id);
        CREATE INDEX IF NOT EXISTS idx_requests_place_id ON requests(place_id);

        CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY,
            person_id TEXT REFERENCES persons(id),
            cat_id TEXT REFERENCES cats(id),
            scheduled_for TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_appointments_person_id ON appointments(person_id);

        CREATE TABLE IF NOT EXISTS person_places (
            person_id TEXT NOT NULL REFERENCES persons(id),
            place_id TEXT NOT NULL REFERENCES places(id),
            role TEXT NOT NULL DEFAULT 'caretaker',
            PRIMARY KEY (person_id, place_id)
        );

        -- Deterministic dedup stream. The pair key doubles as the stable
        -- candidate identity, so re-running the scan cannot double-queue
        -- a collision. Tier 4 never appears here; it belongs to
        -- prevention_events.
        CREATE TABLE IF NOT EXISTS dedup_candidates (
            left_id TEXT NOT NULL,
            right_id TEXT NOT NULL,
            entity TEXT NOT NULL DEFAULT 'person',
            tier INTEGER NOT NULL,
            name_similarity REAL NOT NULL DEFAULT 0,
            shared_email TEXT,
            shared_phone TEXT,
            detected_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            resolved_by TEXT,
            resolved_at TEXT,
            notes TEXT,
            PRIMARY KEY (left_id, right_id)
        );

        CREATE INDEX IF NOT EXISTS idx_dedup_candidates_status ON dedup_candidates(status);
        CREATE INDEX IF NOT EXISTS idx_dedup_candidates_tier ON dedup_candidates(tier);

        -- Intake-time prevention events (tier 4): a new record matched an
        -- existing person on name + address, was created anyway, and is
        -- flagged for review.
        CREATE TABLE IF NOT EXISTS prevention_events (
            id TEXT PRIMARY KEY,
            matched_person_id TEXT NOT NULL REFERENCES persons(id),
            incoming_person_id TEXT NOT NULL REFERENCES persons(id),
            name_similarity REAL NOT NULL DEFAULT 0,
            address_exact INTEGER NOT NULL DEFAULT 1,
            detected_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            resolved_by TEXT,
            resolved_at TEXT,
            notes TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_prevention_events_status ON prevention_events(status);

        -- Probabilistic matching engine output (tier 6). Status uses the
        -- engine's native vocabulary: pending, approved, rejected, merged.
        CREATE TABLE IF NOT EXISTS engine_decisions (
            id TEXT PRIMARY KEY,
            person_a_id TEXT NOT NULL REFERENCES persons(id),
            person_b_id TEXT NOT NULL REFERENCES persons(id),
            match_probability REAL,
            top_candidate_score REAL,
            comparison_vector TEXT DEFAULT '{}',
            detected_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            resolved_by TEXT,
            resolved_at TEXT,
            notes TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_engine_decisions_status ON engine_decisions(status);

        -- Append-only audit trail of resolution decisions.
        CREATE TABLE IF NOT EXISTS resolution_log (
            id TEXT PRIMARY KEY,
            composite_id TEXT NOT NULL,
            action TEXT NOT NULL,
            resolved_by TEXT NOT NULL,
            resolved_at TEXT NOT NULL,
            notes TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_resolution_log_composite_id ON resolution_log(composite_id);
        "#,
    )
    .await?;

    Ok(())
}
