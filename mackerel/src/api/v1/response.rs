//! # V1 API Response Envelope & Error Contract
//!
//! Defines the canonical wire format for all v1 API responses. Every endpoint
//! returns an [`ApiResponse<T>`] envelope with three optional top-level fields:
//!
//! ```json
//! {
//!   "data": { ... },       // present on success, absent on error
//!   "meta": { "pagination": { ... }, "total": 42 },  // optional
//!   "error": { "code": "already_resolved", "message": "..." }  // present on error
//! }
//! ```
//!
//! ## ID Formats
//!
//! - **compositeId**: `{source}:{key1}[:{key2}]` (e.g. `"dedup:P1:P2"`,
//!   `"engine:D7"`)
//! - **audit log id**: nanoid, 21 characters
//!
//! ## Error codes
//!
//! The write path distinguishes its failure modes: a malformed candidate id
//! (`invalid_candidate`) and a bad action (`invalid_action`) are caller
//! errors; `already_resolved` means another session won the race and the
//! right response is a refresh, not a retry; `resolution_failed` carries the
//! store's own message because a failed merge must never look like success.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::MackerelError;
use crate::models::Pagination;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"invalid_action"`).
/// Each variant maps to a fixed HTTP status code via [`ErrorCode::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request was malformed, had invalid parameters, or failed
    /// validation. HTTP 400.
    InvalidRequest,
    /// The composite candidate id is malformed or names an unknown
    /// candidate. Not retryable. HTTP 400.
    InvalidCandidate,
    /// The action is outside the fixed vocabulary
    /// (merge / keep_separate / dismiss). HTTP 400.
    InvalidAction,
    /// Authentication is required or the provided credentials are invalid.
    /// HTTP 401.
    Unauthorized,
    /// The requested resource does not exist. HTTP 404.
    NotFound,
    /// Another session resolved this candidate first. Refresh instead of
    /// retrying. HTTP 409.
    AlreadyResolved,
    /// The underlying resolver failed mid-write; the message is the
    /// store's own. Not retried automatically. HTTP 500.
    ResolutionFailed,
    /// A candidate source is temporarily unavailable. HTTP 503.
    SourceUnavailable,
    /// An unexpected server-side error occurred. Internal details are never
    /// leaked to the client. HTTP 500.
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code corresponding to this error code.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::InvalidCandidate => StatusCode::BAD_REQUEST,
            Self::InvalidAction => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyResolved => StatusCode::CONFLICT,
            Self::ResolutionFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SourceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::InvalidCandidate => write!(f, "invalid_candidate"),
            Self::InvalidAction => write!(f, "invalid_action"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyResolved => write!(f, "already_resolved"),
            Self::ResolutionFailed => write!(f, "resolution_failed"),
            Self::SourceUnavailable => write!(f, "source_unavailable"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

impl From<&MackerelError> for ErrorCode {
    fn from(err: &MackerelError) -> Self {
        match err {
            MackerelError::NotFound(_) => ErrorCode::NotFound,
            MackerelError::Validation(_) | MackerelError::Json(_) => ErrorCode::InvalidRequest,
            MackerelError::InvalidCandidate(_) => ErrorCode::InvalidCandidate,
            MackerelError::InvalidAction(_) => ErrorCode::InvalidAction,
            MackerelError::AlreadyResolved(_) => ErrorCode::AlreadyResolved,
            MackerelError::OracleWrite(_) => ErrorCode::ResolutionFailed,
            MackerelError::SourceUnavailable(_) => ErrorCode::SourceUnavailable,
            MackerelError::Database(_) | MackerelError::Io(_) | MackerelError::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }
}

/// Structured error payload within the API envelope.
///
/// ```json
/// { "code": "already_resolved", "message": "dedup candidate 'P1:P2' is already merged" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Machine-readable error classification.
    pub code: ErrorCode,
    /// Human-readable description safe to display to staff.
    pub message: String,
}

/// Pagination and total metadata included in list responses.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Page bounds echoed back, with the approximation flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Total number of matching items (when cheaply available).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Canonical v1 API response envelope.
///
/// Every v1 endpoint returns this shape. On success, `data` is present and
/// `error` is absent. On error, `error` is present and `data` is absent.
/// `meta` is optionally present for paginated responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// The response payload. Present on success, absent on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Pagination metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    /// Error details. Present on error, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            meta: None,
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Success response with data and pagination metadata (HTTP 200).
    pub fn success_with_meta(data: T, meta: ResponseMeta) -> Self {
        Self {
            data: Some(data),
            meta: Some(meta),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            meta: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let fallback = ApiResponse::<()>::error(
                    ErrorCode::InternalError,
                    "An internal error occurred",
                );
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (fallback.status, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<MackerelError> for ApiResponse<T> {
    /// Convert a [`MackerelError`] into a v1 [`ApiResponse`].
    ///
    /// Internal errors (database, IO) never leak details: a generic message
    /// is returned and the real error is logged via `tracing::error!`. The
    /// resolution-specific errors keep their messages, since staff need to
    /// see them to act.
    fn from(err: MackerelError) -> Self {
        let code = ErrorCode::from(&err);
        match code {
            ErrorCode::InternalError => {
                tracing::error!(error = %err, "Internal error mapped to v1 response");
                ApiResponse::error(code, "An internal error occurred")
            }
            _ => ApiResponse::error(code, err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_serializes_without_error() {
        let resp = ApiResponse::success("hello");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["data"], "hello");
        assert!(json.get("error").is_none());
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn error_response_serializes_without_data() {
        let resp = ApiResponse::<()>::error(ErrorCode::NotFound, "gone");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "not_found");
        assert_eq!(json["error"]["message"], "gone");
    }

    #[test]
    fn success_with_meta_serializes_pagination() {
        let meta = ResponseMeta {
            pagination: Some(Pagination {
                limit: 25,
                offset: 0,
                returned: 3,
                approximate: true,
            }),
            total: Some(42),
        };
        let resp = ApiResponse::success_with_meta(vec![1, 2, 3], meta);
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["meta"]["pagination"]["limit"], 25);
        assert_eq!(json["meta"]["pagination"]["approximate"], true);
        assert_eq!(json["meta"]["total"], 42);
    }

    #[test]
    fn error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidCandidate.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidAction.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::AlreadyResolved.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::ResolutionFailed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::SourceUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_code_serializes_snake_case() {
        let json = serde_json::to_value(ErrorCode::AlreadyResolved).expect("serialize");
        assert_eq!(json, "already_resolved");

        let json = serde_json::to_value(ErrorCode::InvalidCandidate).expect("serialize");
        assert_eq!(json, "invalid_candidate");

        let json = serde_json::to_value(ErrorCode::ResolutionFailed).expect("serialize");
        assert_eq!(json, "resolution_failed");
    }

    #[test]
    fn already_resolved_keeps_its_message() {
        let resp: ApiResponse<()> =
            MackerelError::AlreadyResolved("candidate is already merged".into()).into();
        let err = resp.error.as_ref().expect("error");
        assert_eq!(err.code, ErrorCode::AlreadyResolved);
        assert_eq!(err.message, "Candidate already resolved: candidate is already merged");
    }

    #[test]
    fn oracle_write_surfaces_store_message() {
        let resp: ApiResponse<()> =
            MackerelError::OracleWrite("FOREIGN KEY constraint failed".into()).into();
        let err = resp.error.as_ref().expect("error");
        assert_eq!(err.code, ErrorCode::ResolutionFailed);
        assert!(err.message.contains("FOREIGN KEY constraint failed"));
    }

    #[test]
    fn internal_error_does_not_leak() {
        let resp: ApiResponse<()> = MackerelError::Internal("secret debug info".into()).into();
        let err = resp.error.as_ref().expect("error");
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(err.message, "An internal error occurred");
    }

    #[test]
    fn invalid_candidate_and_action_are_distinguishable() {
        let candidate: ApiResponse<()> =
            MackerelError::InvalidCandidate("bad id".into()).into();
        let action: ApiResponse<()> = MackerelError::InvalidAction("bad verb".into()).into();
        assert_eq!(
            candidate.error.as_ref().unwrap().code,
            ErrorCode::InvalidCandidate
        );
        assert_eq!(action.error.as_ref().unwrap().code, ErrorCode::InvalidAction);
    }
}
