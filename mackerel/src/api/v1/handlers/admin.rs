//! v1 Admin handlers.

use axum::extract::State;

use crate::api::v1::dto::ScanRunResponse;
use crate::api::v1::response::{ApiResponse, ErrorCode};
use crate::api::AppState;

/// `POST /api/v1/admin/duplicates:scan`
#[utoipa::path(
    post,
    path = "/api/v1/admin/duplicates:scan",
    tag = "admin",
    responses(
        (status = 200, description = "Detection scan completed", body = ScanRunResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn run_scan(State(state): State<AppState>) -> ApiResponse<ScanRunResponse> {
    match state.detection.run_once().await {
        Ok(summary) => ApiResponse::success(ScanRunResponse {
            pairs_evaluated: summary.pairs_evaluated,
            candidates_created: summary.candidates_created,
        }),
        Err(e) => ApiResponse::error(
            ErrorCode::InternalError,
            format!("Detection scan failed: {e}"),
        ),
    }
}
