// Common test utilities for integration tests
use std::sync::Once;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use chrono::{Duration, Utc};
use libsql::{params, Connection};
use std::sync::Arc;
use tempfile::NamedTempFile;

use mackerel::api::{create_router, AppState};
use mackerel::config::{
    Config, DatabaseConfig, MatchingConfig, QueueConfig, ResolutionConfig, ServerConfig,
};
use mackerel::db::{Database, LibSqlBackend, MatchingOracle};

pub const API_KEY: &str = "integration-key";

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Fresh app over a file-backed database, plus a raw connection for
/// fixture inserts and assertions.
pub async fn setup_app() -> (Router, Connection, NamedTempFile) {
    init_test_logger();

    let temp_file = NamedTempFile::new().expect("temp db file");
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_keys: vec![API_KEY.to_string()],
        },
        database: DatabaseConfig {
            url: temp_file.path().to_str().unwrap().to_string(),
            auth_token: None,
            local_path: None,
        },
        queue: QueueConfig {
            default_limit: 25,
            max_limit: 200,
            source_timeout_secs: 10,
        },
        resolution: ResolutionConfig {
            batch_concurrency: 4,
        },
        matching: MatchingConfig {
            name_agreement_threshold: 0.85,
            weak_name_threshold: 0.92,
            scan_enabled: false,
            scan_interval_secs: 3600,
        },
    };

    let raw_db = Database::new(&config.database).await.expect("database");
    let conn = raw_db.connect().expect("connection");
    let db: Arc<dyn MatchingOracle> = Arc::new(LibSqlBackend::new(raw_db));
    let app = create_router(AppState::new(config, db));

    (app, conn, temp_file)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {API_KEY}"))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {API_KEY}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn insert_person(
    conn: &Connection,
    id: &str,
    first: &str,
    last: &str,
    email: Option<&str>,
    phone: Option<&str>,
    days_old: i64,
) {
    let created = (Utc::now() - Duration::days(days_old)).to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO persons (id, first_name, last_name, email, phone, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
        params![
            id,
            first,
            last,
            email.map(str::to_string),
            phone.map(str::to_string),
            created
        ],
    )
    .await
    .unwrap();
}

pub async fn insert_cat(conn: &Connection, id: &str, person_id: &str) {
    conn.execute(
        "INSERT INTO cats (id, name, person_id, created_at) VALUES (?1, ?1, ?2, ?3)",
        params![id, person_id, Utc::now().to_rfc3339()],
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
            detected_at, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending')
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

pub async fn scalar_string(conn: &Connection, sql: &str) -> Option<String> {
    let mut rows = conn.query(sql, ()).await.unwrap();
    rows.next().await.unwrap().and_then(|row| row.get(0).ok())
}
