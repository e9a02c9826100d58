//! Shared fixtures for database-backed tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use libsql::{params, Connection};
use tempfile::NamedTempFile;

use crate::config::DatabaseConfig;
use crate::db::{Database, LibSqlBackend, MatchingOracle};

/// Fresh file-backed database with the full schema, plus a raw connection
/// for fixture inserts and assertions.
pub async fn setup_test_db() -> (Connection, Arc<dyn MatchingOracle>, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let config = DatabaseConfig {
        url: temp_file.path().to_str().unwrap().to_string(),
        auth_token: None,
        local_path: None,
    };

    let db = Database::new(&config).await.unwrap();
    let conn = db.connect().unwrap();
    let backend: Arc<dyn MatchingOracle> = Arc::new(LibSqlBackend::new(db));

    (conn, backend, temp_file)
}

pub async fn insert_person(
    conn: &Connection,
    id: &str,
    first: Option<&str>,
    last: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
) {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO persons (id, first_name, last_name, email, phone, address, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)
        "#,
        params![
            id,
            first.map(str::to_string),
            last.map(str::to_string),
            email.map(str::to_string),
            phone.map(str::to_string),
            now
        ],
    )
    .await
    .unwrap();
}

pub async fn insert_place(conn: &Connection, id: &str, label: Option<&str>, address: Option<&str>) {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO places (id, label, address, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
        params![
            id,
            label.map(str::to_string),
            address.map(str::to_string),
            now
        ],
    )
    .await
    .unwrap();
}

pub async fn insert_cat(conn: &Connection, id: &str, person_id: &str) {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO cats (id, name, person_id, created_at) VALUES (?1, ?1, ?2, ?3)",
        params![id, person_id, now],
    )
    .await
    .unwrap();
}

pub async fn insert_request(conn: &Connection, id: &str, person_id: &str) {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO requests (id, person_id, summary, created_at) VALUES (?1, ?2, 'trap request', ?3)",
        params![id, person_id, now],
    )
    .await
    .unwrap();
}

pub async fn insert_appointment(conn: &Connection, id: &str, person_id: &str) {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO appointments (id, person_id, created_at) VALUES (?1, ?2, ?3)",
        params![id, person_id, now],
    )
    .await
    .unwrap();
}

pub async fn link_person_place(conn: &Connection, person_id: &str, place_id: &str) {
    conn.execute(
        "INSERT INTO person_places (person_id, place_id) VALUES (?1, ?2)",
        params![person_id, place_id],
    )
    .await
    .unwrap();
}

pub async fn insert_dedup_candidate(
    conn: &Connection,
    left_id: &str,
    right_id: &str,
    tier: u8,
    hours_ago: i64,
) {
    let detected = (Utc::now() - Duration::hours(hours_ago)).to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO dedup_candidates (left_id, right_id, entity, tier, name_similarity, detected_at, status)
        VALUES (?1, ?2, 'person', ?3, 0.9, ?4, 'pending')
        "#,
        params![left_id, right_id, i64::from(tier), detected],
    )
    .await
    .unwrap();
}

pub async fn insert_dedup_place_candidate(
    conn: &Connection,
    left_id: &str,
    right_id: &str,
    tier: u8,
    hours_ago: i64,
) {
    let detected = (Utc::now() - Duration::hours(hours_ago)).to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO dedup_candidates (left_id, right_id, entity, tier, name_similarity, detected_at, status)
        VALUES (?1, ?2, 'place', ?3, 0.88, ?4, 'pending')
        "#,
        params![left_id, right_id, i64::from(tier), detected],
    )
    .await
    .unwrap();
}

pub async fn insert_prevention_event(
    conn: &Connection,
    id: &str,
    matched_id: &str,
    incoming_id: &str,
    hours_ago: i64,
) {
    let detected = (Utc::now() - Duration::hours(hours_ago)).to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO prevention_events (id, matched_person_id, incoming_person_id, name_similarity, address_exact, detected_at, status)
        VALUES (?1, ?2, ?3, 0.93, 1, ?4, 'pending')
        "#,
        params![id, matched_id, incoming_id, detected],
    )
    .await
    .unwrap();
}

pub async fn insert_engine_decision(
    conn: &Connection,
    id: &str,
    person_a_id: &str,
    person_b_id: &str,
    match_probability: Option<f64>,
    top_candidate_score: Option<f64>,
    hours_ago: i64,
) {
    let detected = (Utc::now() - Duration::hours(hours_ago)).to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO engine_decisions (
            id, person_a_id, person_b_id, match_probability, top_candidate_score,
            comparison_vector, detected_at, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, '{"name_similar_high":"agree","address_exact":"disagree"}', ?6, 'pending')
        "#,
        params![
            id,
            person_a_id,
            person_b_id,
            match_probability,
            top_candidate_score,
            detected
        ],
    )
    .await
    .unwrap();
}

/// Fetch a single scalar column for assertions.
pub async fn scalar_string(conn: &Connection, sql: &str) -> Option<String> {
    let mut rows = conn.query(sql, ()).await.unwrap();
    rows.next().await.unwrap().and_then(|row| row.get(0).ok())
}

pub async fn scalar_i64(conn: &Connection, sql: &str) -> i64 {
    let mut rows = conn.query(sql, ()).await.unwrap();
    rows.next().await.unwrap().unwrap().get(0).unwrap()
}
