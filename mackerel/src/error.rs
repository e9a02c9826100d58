use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MackerelError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Candidate source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid candidate id: {0}")]
    InvalidCandidate(String),

    #[error("Invalid resolution action: {0}")]
    InvalidAction(String),

    #[error("Candidate already resolved: {0}")]
    AlreadyResolved(String),

    #[error("Resolution write failed: {0}")]
    OracleWrite(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for MackerelError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            MackerelError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            MackerelError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            MackerelError::InvalidCandidate(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            MackerelError::InvalidAction(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            MackerelError::AlreadyResolved(msg) => (StatusCode::CONFLICT, msg.clone()),
            MackerelError::SourceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            MackerelError::OracleWrite(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            MackerelError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            MackerelError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            MackerelError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            MackerelError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, MackerelError>;
