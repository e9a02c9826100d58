//! Resolution coordinator: route a decision to the resolver that owns it.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use nanoid::nanoid;

use crate::config::ResolutionConfig;
use crate::db::MatchingOracle;
use crate::error::Result;
use crate::models::{CompositeId, MergeDecision, ResolutionAction, ResolutionReceipt, ResolveItem};

/// Outcome of one item in a batch. Failures are data, not early exits.
#[derive(Debug)]
pub struct BatchItemResult {
    pub id: String,
    pub outcome: Result<ResolutionReceipt>,
}

#[derive(Clone)]
pub struct ResolutionService {
    db: Arc<dyn MatchingOracle>,
    batch_concurrency: usize,
}

impl ResolutionService {
    pub fn new(db: Arc<dyn MatchingOracle>, config: &ResolutionConfig) -> Self {
        Self {
            db,
            batch_concurrency: config.batch_concurrency.max(1),
        }
    }

    /// Validate, translate, and dispatch one decision.
    ///
    /// The composite id names the owning source; the action vocabulary is
    /// translated to that source's native one (the engine speaks
    /// approve/reject). Status is always re-checked by the resolver's own
    /// compare-and-set rather than any cached queue snapshot, so a race
    /// lost to another session comes back as `AlreadyResolved`, not a
    /// corrupted merge. The audit entry is appended only after the
    /// resolver commits.
    pub async fn resolve(
        &self,
        id: &str,
        action_raw: &str,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<ResolutionReceipt> {
        let composite = CompositeId::parse(id)?;
        let action: ResolutionAction = action_raw.parse()?;

        match &composite {
            CompositeId::Dedup { left_id, right_id } => {
                self.db
                    .resolve_dedup(left_id, right_id, action, resolved_by, notes)
                    .await?
            }
            CompositeId::Prevention { event_id } => {
                self.db
                    .resolve_prevention(event_id, action, resolved_by, notes)
                    .await?
            }
            CompositeId::Engine { decision_id } => {
                self.db
                    .resolve_engine(decision_id, action.engine_action(), resolved_by, notes)
                    .await?
            }
        }

        let decision = MergeDecision {
            id: nanoid!(),
            composite_id: composite.to_string(),
            action,
            resolved_by: resolved_by.to_string(),
            resolved_at: Utc::now(),
            notes: notes.map(str::to_string),
        };
        // The resolution itself already committed; a failed audit append is
        // logged rather than reported as a failed resolution.
        if let Err(e) = self.db.record_decision(&decision).await {
            tracing::error!(
                "Failed to record audit entry for {}: {}",
                decision.composite_id,
                e
            );
        }

        Ok(ResolutionReceipt {
            composite_id: decision.composite_id,
            action,
            status: action.terminal_status(),
            resolved_at: decision.resolved_at,
        })
    }

    /// Dispatch N independent resolutions with bounded concurrency and
    /// report an outcome per item. No batch-level atomicity: concurrent
    /// staff activity resolving an item mid-batch is an expected partial
    /// success, not a rollback.
    pub async fn resolve_batch(
        &self,
        items: Vec<ResolveItem>,
        resolved_by: &str,
    ) -> Vec<BatchItemResult> {
        futures::stream::iter(items.into_iter().map(|item| {
            let service = self.clone();
            let resolved_by = resolved_by.to_string();
            async move {
                let outcome = service
                    .resolve(&item.id, &item.action, &resolved_by, item.notes.as_deref())
                    .await;
                BatchItemResult {
                    id: item.id,
                    outcome,
                }
            }
        }))
        .buffered(self.batch_concurrency)
        .collect()
        .await
    }

    /// Audit entries for one candidate, newest first.
    pub async fn decisions_for(&self, id: &str) -> Result<Vec<MergeDecision>> {
        let composite = CompositeId::parse(id)?;
        self.db.decisions_for(&composite.to_string()).await
    }
}
