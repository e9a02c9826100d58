use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;
use super::middleware::v1_auth_middleware;

pub fn v1_router(state: AppState) -> Router<AppState> {
    let duplicates = Router::new()
        .route("/", get(handlers::duplicates::list_duplicates))
        .route("/stats", get(handlers::duplicates::get_stats))
        .route("/log", get(handlers::duplicates::list_log));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    let protected_routes = Router::new()
        .nest("/duplicates", duplicates)
        .route(
            "/duplicates:resolve",
            post(handlers::duplicates::resolve),
        )
        .route(
            "/duplicates:resolveBatch",
            post(handlers::duplicates::resolve_batch),
        )
        .route("/admin/duplicates:scan", post(handlers::admin::run_scan))
        .route_layer(middleware::from_fn_with_state(state, v1_auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
