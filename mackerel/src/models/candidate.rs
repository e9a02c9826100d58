//! Unified duplicate-candidate model.
//!
//! Three independent streams propose identity collisions: the deterministic
//! dedup pass (`dedup`), intake-time prevention events (`prevention`), and the
//! probabilistic matching engine (`engine`). Each stream keeps its own native
//! rows and status; the types here are the one shape the review queue and the
//! resolution coordinator agree on.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MackerelError;

/// Origin stream of a duplicate candidate. Doubles as the composite-id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum CandidateSource {
    /// Deterministic dedup pass over existing records (tiers 1, 2, 3, 5).
    #[serde(rename = "dedup")]
    Dedup,
    /// Intake-time prevention events (tier 4, name + address agreement).
    #[serde(rename = "prevention")]
    Prevention,
    /// Probabilistic matching engine, model-scored (tier 6).
    #[serde(rename = "engine")]
    Engine,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Dedup => "dedup",
            CandidateSource::Prevention => "prevention",
            CandidateSource::Engine => "engine",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateSource {
    type Err = MackerelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dedup" => Ok(CandidateSource::Dedup),
            "prevention" => Ok(CandidateSource::Prevention),
            "engine" => Ok(CandidateSource::Engine),
            other => Err(MackerelError::InvalidCandidate(format!(
                "unknown candidate source '{other}'"
            ))),
        }
    }
}

/// Which kind of record a candidate pair refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Place,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Place => "place",
        }
    }
}

impl FromStr for EntityKind {
    type Err = MackerelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person" => Ok(EntityKind::Person),
            "place" => Ok(EntityKind::Place),
            other => Err(MackerelError::Validation(format!(
                "unknown entity kind '{other}'"
            ))),
        }
    }
}

/// Candidate lifecycle. `pending` is the only state that accepts a
/// resolution; every other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Merged,
    KeptSeparate,
    Dismissed,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Merged => "merged",
            CandidateStatus::KeptSeparate => "kept_separate",
            CandidateStatus::Dismissed => "dismissed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CandidateStatus::Pending)
    }
}

impl FromStr for CandidateStatus {
    type Err = MackerelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CandidateStatus::Pending),
            "merged" => Ok(CandidateStatus::Merged),
            "kept_separate" => Ok(CandidateStatus::KeptSeparate),
            "dismissed" => Ok(CandidateStatus::Dismissed),
            other => Err(MackerelError::Validation(format!(
                "unknown candidate status '{other}'"
            ))),
        }
    }
}

/// Parsed composite candidate id: `{source}:{key1}[:{key2}]`.
///
/// The flat string is the routing key the review UI hands back on
/// resolution; parsing it here is the only place source-specific key shapes
/// are known. Reproducible from the same underlying pair, so repeated queue
/// rebuilds never fabricate new identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeId {
    Dedup { left_id: String, right_id: String },
    Prevention { event_id: String },
    Engine { decision_id: String },
}

impl CompositeId {
    pub fn parse(raw: &str) -> Result<Self, MackerelError> {
        let mut parts = raw.split(':');
        let prefix = parts.next().unwrap_or_default();
        let source: CandidateSource = prefix.parse().map_err(|_| {
            MackerelError::InvalidCandidate(format!("unrecognized candidate id '{raw}'"))
        })?;
        let keys: Vec<&str> = parts.collect();

        match source {
            CandidateSource::Dedup => match keys.as_slice() {
                [left, right] if !left.is_empty() && !right.is_empty() => Ok(CompositeId::Dedup {
                    left_id: (*left).to_string(),
                    right_id: (*right).to_string(),
                }),
                _ => Err(MackerelError::InvalidCandidate(format!(
                    "dedup candidate id must be dedup:<left>:<right>, got '{raw}'"
                ))),
            },
            CandidateSource::Prevention => match keys.as_slice() {
                [event] if !event.is_empty() => Ok(CompositeId::Prevention {
                    event_id: (*event).to_string(),
                }),
                _ => Err(MackerelError::InvalidCandidate(format!(
                    "prevention candidate id must be prevention:<event>, got '{raw}'"
                ))),
            },
            CandidateSource::Engine => match keys.as_slice() {
                [decision] if !decision.is_empty() => Ok(CompositeId::Engine {
                    decision_id: (*decision).to_string(),
                }),
                _ => Err(MackerelError::InvalidCandidate(format!(
                    "engine candidate id must be engine:<decision>, got '{raw}'"
                ))),
            },
        }
    }

    pub fn source(&self) -> CandidateSource {
        match self {
            CompositeId::Dedup { .. } => CandidateSource::Dedup,
            CompositeId::Prevention { .. } => CandidateSource::Prevention,
            CompositeId::Engine { .. } => CandidateSource::Engine,
        }
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeId::Dedup { left_id, right_id } => {
                write!(f, "dedup:{left_id}:{right_id}")
            }
            CompositeId::Prevention { event_id } => write!(f, "prevention:{event_id}"),
            CompositeId::Engine { decision_id } => write!(f, "engine:{decision_id}"),
        }
    }
}

/// Denormalized display attributes of one side of a candidate pair.
///
/// A read-only projection for the review UI, never the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityAttributes {
    pub id: String,
    /// Display name, already placeholder-substituted for nameless records.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub cat_count: i64,
    pub request_count: i64,
}

/// One proposed identity collision, in the unified shape shared by all
/// three sources.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCandidate {
    /// `{source}:{key1}[:{key2}]`, stable across queue rebuilds.
    pub composite_id: String,
    pub source: CandidateSource,
    pub entity: EntityKind,
    /// Confidence bucket, 1 (highest) through 6 (model-scored uncertain).
    pub tier: u8,
    /// Display/sort scalar in [0, 1]. Name similarity for tiers 1-5,
    /// model confidence for tier 6.
    pub similarity: f64,
    /// Calibrated same-entity probability when a model scored the pair,
    /// otherwise estimated from the tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_probability: Option<f64>,
    /// Per-field agreement detail for the review UI, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_vector: Option<BTreeMap<String, String>>,
    pub left: EntityAttributes,
    pub right: EntityAttributes,
    #[schema(value_type = String)]
    pub detected_at: DateTime<Utc>,
    /// Hours since the source detected the pair. Triage sort key.
    pub queue_hours: f64,
}
