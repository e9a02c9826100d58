use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mackerel API",
        version = "1.0.0",
        description = "Admin backend for trap-neuter-return rescue operations. REST API for the duplicate-record review queue.",
    ),
    paths(
        handlers::health::health_check,
        handlers::duplicates::list_duplicates,
        handlers::duplicates::get_stats,
        handlers::duplicates::list_log,
        handlers::duplicates::resolve,
        handlers::duplicates::resolve_batch,
        handlers::admin::run_scan,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        // Duplicates
        dto::duplicates::ListDuplicatesQuery,
        dto::duplicates::DuplicateQueueResponse,
        dto::duplicates::ResolveRequest,
        dto::duplicates::BatchResolveItem,
        dto::duplicates::BatchResolveRequest,
        dto::duplicates::BatchResolveResult,
        dto::duplicates::BatchResolveResponse,
        dto::duplicates::DecisionLogQuery,
        dto::duplicates::ScanRunResponse,
        // Models exposed on the wire
        crate::models::DuplicateCandidate,
        crate::models::EntityAttributes,
        crate::models::CandidateSource,
        crate::models::CandidateStatus,
        crate::models::EntityKind,
        crate::models::ResolutionAction,
        crate::models::ResolutionReceipt,
        crate::models::MergeDecision,
        crate::models::QueueStats,
        crate::models::Pagination,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::SourcesStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "duplicates", description = "Duplicate-record review queue and resolution"),
        (name = "admin", description = "Administrative operations (auth required)"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
