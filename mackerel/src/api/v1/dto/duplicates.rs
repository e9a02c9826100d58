//! Duplicate review request/response DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::api::v1::response::ErrorCode;
use crate::models::{DuplicateCandidate, QueueStats};

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /v1/duplicates`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListDuplicatesQuery {
    /// Tier-group filter: `tier1`..`tier5`, `uncertain`, or `all` (default).
    pub filter: Option<String>,
    /// Maximum merged results per page.
    pub limit: Option<u32>,
    /// Per-source offset.
    pub offset: Option<u32>,
}

/// Request body for `POST /v1/duplicates:resolve`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    /// Composite candidate id, e.g. `"dedup:P1:P2"` or `"engine:D7"`.
    pub id: String,
    /// `merge` | `keep_separate` | `dismiss`.
    pub action: String,
    /// Free-form reviewer notes, stored in the audit trail.
    pub notes: Option<String>,
    /// Staff name recorded in the audit trail.
    pub resolved_by: Option<String>,
}

/// One item of `POST /v1/duplicates:resolveBatch`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResolveItem {
    pub id: String,
    pub action: String,
    pub notes: Option<String>,
}

/// Request body for `POST /v1/duplicates:resolveBatch`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResolveRequest {
    pub items: Vec<BatchResolveItem>,
    /// Staff name recorded against every item in the batch.
    pub resolved_by: Option<String>,
}

/// Query parameters for `GET /v1/duplicates/log`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct DecisionLogQuery {
    /// Composite candidate id whose decisions to list.
    pub id: String,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// Payload of `GET /v1/duplicates`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateQueueResponse {
    pub items: Vec<DuplicateCandidate>,
    pub stats: QueueStats,
    /// Diagnostics for sources that contributed nothing to this build.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Per-item outcome in the batch response. A failed item carries the same
/// machine-readable code a single resolve would have returned, so the UI
/// can tell "refresh" (already_resolved) apart from "fix the request".
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResolveResult {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

/// Payload of `POST /v1/duplicates:resolveBatch`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResolveResponse {
    pub results: Vec<BatchResolveResult>,
    pub succeeded: u32,
    pub failed: u32,
}

/// Payload of `POST /v1/admin/duplicates:scan`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanRunResponse {
    pub pairs_evaluated: u64,
    pub candidates_created: u64,
}
