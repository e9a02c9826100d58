//! v1 duplicate-review handlers: the queue read path and the resolution
//! write path.

use axum::extract::{Query, State};
use axum::Json;

use crate::api::v1::dto::{
    BatchResolveRequest, BatchResolveResponse, BatchResolveResult, DecisionLogQuery,
    DuplicateQueueResponse, ListDuplicatesQuery, ResolveRequest,
};
use crate::api::v1::response::{ApiResponse, ErrorCode, ResponseMeta};
use crate::api::AppState;
use crate::models::{MergeDecision, QueueFilter, QueueStats, ResolutionReceipt, ResolveItem};

/// Actor recorded when the caller does not name one. Staff identity lives
/// outside this service; the audit trail still needs a value.
const DEFAULT_ACTOR: &str = "staff";

/// `GET /api/v1/duplicates`
#[utoipa::path(
    get,
    path = "/api/v1/duplicates",
    tag = "duplicates",
    params(ListDuplicatesQuery),
    responses(
        (status = 200, description = "One review-queue page with stats", body = DuplicateQueueResponse),
        (status = 400, description = "Unknown filter value"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_duplicates(
    State(state): State<AppState>,
    Query(query): Query<ListDuplicatesQuery>,
) -> ApiResponse<DuplicateQueueResponse> {
    let filter = match QueueFilter::parse(query.filter.as_deref()) {
        Ok(filter) => filter,
        Err(e) => return e.into(),
    };

    match state
        .queue
        .build(filter, query.limit, query.offset.unwrap_or(0))
        .await
    {
        Ok(page) => {
            let meta = ResponseMeta {
                total: Some(page.stats.total),
                pagination: Some(page.pagination),
            };
            ApiResponse::success_with_meta(
                DuplicateQueueResponse {
                    items: page.items,
                    stats: page.stats,
                    notes: page.notes,
                },
                meta,
            )
        }
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/duplicates/stats`
#[utoipa::path(
    get,
    path = "/api/v1/duplicates/stats",
    tag = "duplicates",
    responses(
        (status = 200, description = "Pending counts per tier", body = QueueStats),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_stats(State(state): State<AppState>) -> ApiResponse<QueueStats> {
    match state.queue.stats().await {
        Ok(stats) => ApiResponse::success(stats),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/duplicates/log`
#[utoipa::path(
    get,
    path = "/api/v1/duplicates/log",
    tag = "duplicates",
    params(DecisionLogQuery),
    responses(
        (status = 200, description = "Audit entries for one candidate, newest first", body = [MergeDecision]),
        (status = 400, description = "Malformed composite id"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_log(
    State(state): State<AppState>,
    Query(query): Query<DecisionLogQuery>,
) -> ApiResponse<Vec<MergeDecision>> {
    match state.resolution.decisions_for(&query.id).await {
        Ok(decisions) => ApiResponse::success(decisions),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/duplicates:resolve`
#[utoipa::path(
    post,
    path = "/api/v1/duplicates:resolve",
    tag = "duplicates",
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Candidate resolved", body = ResolutionReceipt),
        (status = 400, description = "Malformed id or unknown action"),
        (status = 409, description = "Another session resolved this candidate first"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn resolve(
    State(state): State<AppState>,
    Json(body): Json<ResolveRequest>,
) -> ApiResponse<ResolutionReceipt> {
    let resolved_by = body.resolved_by.as_deref().unwrap_or(DEFAULT_ACTOR);

    match state
        .resolution
        .resolve(&body.id, &body.action, resolved_by, body.notes.as_deref())
        .await
    {
        Ok(receipt) => ApiResponse::success(receipt),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/duplicates:resolveBatch`
///
/// Always returns 200 with per-item outcomes: partial success is the
/// expected shape when several staff work the queue at once.
#[utoipa::path(
    post,
    path = "/api/v1/duplicates:resolveBatch",
    tag = "duplicates",
    request_body = BatchResolveRequest,
    responses(
        (status = 200, description = "Per-item outcomes", body = BatchResolveResponse),
        (status = 400, description = "Empty batch"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn resolve_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchResolveRequest>,
) -> ApiResponse<BatchResolveResponse> {
    if body.items.is_empty() {
        return ApiResponse::error(
            ErrorCode::InvalidRequest,
            "batch must contain at least one item",
        );
    }

    let resolved_by = body.resolved_by.as_deref().unwrap_or(DEFAULT_ACTOR).to_string();
    let items: Vec<ResolveItem> = body
        .items
        .into_iter()
        .map(|item| ResolveItem {
            id: item.id,
            action: item.action,
            notes: item.notes,
        })
        .collect();

    let outcomes = state.resolution.resolve_batch(items, &resolved_by).await;

    let mut succeeded = 0u32;
    let mut failed = 0u32;
    let results: Vec<BatchResolveResult> = outcomes
        .into_iter()
        .map(|item| match item.outcome {
            Ok(_) => {
                succeeded += 1;
                BatchResolveResult {
                    id: item.id,
                    success: true,
                    error: None,
                    code: None,
                }
            }
            Err(e) => {
                failed += 1;
                BatchResolveResult {
                    id: item.id,
                    success: false,
                    error: Some(e.to_string()),
                    code: Some(ErrorCode::from(&e)),
                }
            }
        })
        .collect();

    ApiResponse::success(BatchResolveResponse {
        results,
        succeeded,
        failed,
    })
}
