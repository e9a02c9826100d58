//! Resolution decisions and their audit record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CandidateStatus;
use crate::error::MackerelError;

/// The fixed, total action vocabulary callers see.
///
/// Each source resolver has its own native semantics; the coordinator
/// translates, so this set is the only one the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Fold the right/duplicate record into the left/kept one.
    Merge,
    /// The pair is two distinct real-world entities.
    KeepSeparate,
    /// Not actionable; drop from the queue without a verdict.
    Dismiss,
}

impl ResolutionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionAction::Merge => "merge",
            ResolutionAction::KeepSeparate => "keep_separate",
            ResolutionAction::Dismiss => "dismiss",
        }
    }

    /// The matching engine's native vocabulary for the same decision.
    pub fn engine_action(&self) -> &'static str {
        match self {
            ResolutionAction::Merge => "merge",
            ResolutionAction::KeepSeparate => "approve",
            ResolutionAction::Dismiss => "reject",
        }
    }

    /// Terminal status a candidate lands in after this action.
    pub fn terminal_status(&self) -> CandidateStatus {
        match self {
            ResolutionAction::Merge => CandidateStatus::Merged,
            ResolutionAction::KeepSeparate => CandidateStatus::KeptSeparate,
            ResolutionAction::Dismiss => CandidateStatus::Dismissed,
        }
    }
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionAction {
    type Err = MackerelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(ResolutionAction::Merge),
            "keep_separate" => Ok(ResolutionAction::KeepSeparate),
            "dismiss" => Ok(ResolutionAction::Dismiss),
            other => Err(MackerelError::InvalidAction(format!(
                "unknown action '{other}'; expected merge, keep_separate, or dismiss"
            ))),
        }
    }
}

/// Audit record appended after every successful resolution: who decided
/// what, when, and why.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MergeDecision {
    pub id: String,
    pub composite_id: String,
    pub action: ResolutionAction,
    pub resolved_by: String,
    #[schema(value_type = String)]
    pub resolved_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Normalized result of a single successful resolution.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReceipt {
    pub composite_id: String,
    pub action: ResolutionAction,
    pub status: CandidateStatus,
    #[schema(value_type = String)]
    pub resolved_at: DateTime<Utc>,
}

/// One item of a batch resolution request, action still unparsed so a bad
/// value fails that item alone.
#[derive(Debug, Clone)]
pub struct ResolveItem {
    pub id: String,
    pub action: String,
    pub notes: Option<String>,
}
