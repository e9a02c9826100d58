use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;

/// Health data returned inside the v1 envelope.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub sources: SourcesStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DatabaseStatus {
    pub status: String,
}

/// Per-stream availability of the candidate sources.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SourcesStatus {
    pub dedup: String,
    pub prevention: String,
    pub engine: String,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let database = match state.db.ping().await {
        Ok(_) => DatabaseStatus {
            status: "ok".to_string(),
        },
        Err(_) => DatabaseStatus {
            status: "error".to_string(),
        },
    };

    let sources = SourcesStatus {
        dedup: source_status(state.db.dedup_stats().await.is_ok()),
        prevention: source_status(state.db.prevention_pending_count().await.is_ok()),
        engine: source_status(state.db.engine_pending_count().await.is_ok()),
    };

    ApiResponse::success(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        sources,
    })
}

fn source_status(available: bool) -> String {
    if available { "ok" } else { "unavailable" }.to_string()
}
