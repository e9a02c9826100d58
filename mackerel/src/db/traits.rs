use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CandidateStatus, EntityKind, MergeDecision, ResolutionAction};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A live person record, as the detection scan sees it.
#[derive(Debug, Clone)]
pub struct PersonRow {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A pair the detection scan wants queued, ready for insertion.
#[derive(Debug, Clone)]
pub struct DetectedPair {
    pub left_id: String,
    pub right_id: String,
    pub tier: u8,
    pub name_similarity: f64,
    pub shared_email: Option<String>,
    pub shared_phone: Option<String>,
}

/// Denormalized display projection of one side of a pair, as fetched.
#[derive(Debug, Clone)]
pub struct PartySnapshot {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub cat_count: i64,
    pub request_count: i64,
}

/// Native row of the deterministic dedup source.
#[derive(Debug, Clone)]
pub struct DedupCandidateRow {
    pub left: PartySnapshot,
    pub right: PartySnapshot,
    pub entity: EntityKind,
    pub tier: u8,
    pub name_similarity: f64,
    pub detected_at: DateTime<Utc>,
    pub status: CandidateStatus,
}

/// Native row of the intake-prevention source (tier 4).
#[derive(Debug, Clone)]
pub struct PreventionEventRow {
    pub id: String,
    /// The pre-existing person the incoming record collided with.
    pub matched: PartySnapshot,
    /// The record that was created anyway, flagged for review.
    pub incoming: PartySnapshot,
    pub name_similarity: f64,
    pub address_exact: bool,
    pub detected_at: DateTime<Utc>,
    pub status: CandidateStatus,
}

/// Native row of the probabilistic matching engine (tier 6).
#[derive(Debug, Clone)]
pub struct EngineDecisionRow {
    pub id: String,
    pub left: PartySnapshot,
    pub right: PartySnapshot,
    pub match_probability: Option<f64>,
    pub top_candidate_score: Option<f64>,
    /// Raw JSON object of per-field agreement flags, as the engine wrote it.
    pub comparison_vector: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub status: CandidateStatus,
}

/// Pending count for one tier.
#[derive(Debug, Clone, Copy)]
pub struct TierCount {
    pub tier: u8,
    pub count: u64,
}

// ---------------------------------------------------------------------------
// Per-source store traits
// ---------------------------------------------------------------------------

/// The deterministic dedup stream (tiers 1, 2, 3, and 5; never 4, which
/// is owned by the prevention stream).
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Pending candidates with both endpoints still live, oldest first.
    /// `tier` pushes the filter predicate into the query.
    async fn fetch_dedup_candidates(
        &self,
        tier: Option<u8>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DedupCandidateRow>>;

    /// Pending counts per tier, independent of pagination.
    async fn dedup_stats(&self) -> Result<Vec<TierCount>>;

    /// Compare-and-set resolution. First writer out of `pending` wins;
    /// a loser gets `AlreadyResolved`. On merge, reassigns the right
    /// record's dependents and tombstones it in the same transaction.
    async fn resolve_dedup(
        &self,
        left_id: &str,
        right_id: &str,
        action: ResolutionAction,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<()>;

    /// Queue detected pairs, ignoring pairs already present. Returns the
    /// number of rows actually inserted.
    async fn insert_dedup_candidates(&self, pairs: &[DetectedPair]) -> Result<u64>;
}

/// The intake-prevention stream (tier 4 events).
#[async_trait]
pub trait PreventionStore: Send + Sync {
    async fn fetch_prevention_events(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PreventionEventRow>>;

    async fn prevention_pending_count(&self) -> Result<u64>;

    async fn resolve_prevention(
        &self,
        event_id: &str,
        action: ResolutionAction,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<()>;
}

/// The probabilistic matching engine stream (tier 6).
///
/// Speaks its native action vocabulary (`merge` / `approve` / `reject`);
/// translation from the unified vocabulary is the coordinator's job.
#[async_trait]
pub trait EngineStore: Send + Sync {
    async fn fetch_engine_decisions(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<EngineDecisionRow>>;

    async fn engine_pending_count(&self) -> Result<u64>;

    async fn resolve_engine(
        &self,
        decision_id: &str,
        native_action: &str,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<()>;
}

/// Live-record access for the detection scan.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Every person without a tombstone pointer.
    async fn list_live_persons(&self) -> Result<Vec<PersonRow>>;
}

/// Append-only audit trail of resolution decisions.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record_decision(&self, decision: &MergeDecision) -> Result<()>;
    async fn decisions_for(&self, composite_id: &str) -> Result<Vec<MergeDecision>>;
}

// ---------------------------------------------------------------------------
// Unified oracle supertrait
// ---------------------------------------------------------------------------

/// The complete matching oracle: every candidate stream, the detection
/// scan's record access, and the audit trail.
#[async_trait]
pub trait MatchingOracle:
    DedupStore + PreventionStore + EngineStore + PersonStore + AuditStore
{
    /// Cheap connectivity probe for health reporting.
    async fn ping(&self) -> Result<()>;
}
