use async_trait::async_trait;

use crate::db::connection::Database;
use crate::db::repository::{
    AuditRepository, DedupRepository, EngineRepository, PersonRepository, PreventionRepository,
};
use crate::db::traits::{
    AuditStore, DedupCandidateRow, DedupStore, DetectedPair, EngineDecisionRow, EngineStore,
    MatchingOracle, PersonRow, PersonStore, PreventionEventRow, PreventionStore, TierCount,
};
use crate::error::Result;
use crate::models::{MergeDecision, ResolutionAction};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DedupStore for LibSqlBackend {
    async fn fetch_dedup_candidates(
        &self,
        tier: Option<u8>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DedupCandidateRow>> {
        let conn = self.db.connect()?;
        DedupRepository::fetch(&conn, tier, limit, offset).await
    }

    async fn dedup_stats(&self) -> Result<Vec<TierCount>> {
        let conn = self.db.connect()?;
        DedupRepository::stats(&conn).await
    }

    async fn resolve_dedup(
        &self,
        left_id: &str,
        right_id: &str,
        action: ResolutionAction,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        let conn = self.db.connect()?;
        DedupRepository::resolve(&conn, left_id, right_id, action, resolved_by, notes).await
    }

    async fn insert_dedup_candidates(&self, pairs: &[DetectedPair]) -> Result<u64> {
        let conn = self.db.connect()?;
        DedupRepository::insert_batch(&conn, pairs).await
    }
}

#[async_trait]
impl PreventionStore for LibSqlBackend {
    async fn fetch_prevention_events(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PreventionEventRow>> {
        let conn = self.db.connect()?;
        PreventionRepository::fetch(&conn, limit, offset).await
    }

    async fn prevention_pending_count(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        PreventionRepository::pending_count(&conn).await
    }

    async fn resolve_prevention(
        &self,
        event_id: &str,
        action: ResolutionAction,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        let conn = self.db.connect()?;
        PreventionRepository::resolve(&conn, event_id, action, resolved_by, notes).await
    }
}

#[async_trait]
impl EngineStore for LibSqlBackend {
    async fn fetch_engine_decisions(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<EngineDecisionRow>> {
        let conn = self.db.connect()?;
        EngineRepository::fetch(&conn, limit, offset).await
    }

    async fn engine_pending_count(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        EngineRepository::pending_count(&conn).await
    }

    async fn resolve_engine(
        &self,
        decision_id: &str,
        native_action: &str,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        let conn = self.db.connect()?;
        EngineRepository::resolve(&conn, decision_id, native_action, resolved_by, notes).await
    }
}

#[async_trait]
impl PersonStore for LibSqlBackend {
    async fn list_live_persons(&self) -> Result<Vec<PersonRow>> {
        let conn = self.db.connect()?;
        PersonRepository::list_live(&conn).await
    }
}

#[async_trait]
impl AuditStore for LibSqlBackend {
    async fn record_decision(&self, decision: &MergeDecision) -> Result<()> {
        let conn = self.db.connect()?;
        AuditRepository::record(&conn, decision).await
    }

    async fn decisions_for(&self, composite_id: &str) -> Result<Vec<MergeDecision>> {
        let conn = self.db.connect()?;
        AuditRepository::list_for(&conn, composite_id).await
    }
}

#[async_trait]
impl MatchingOracle for LibSqlBackend {
    async fn ping(&self) -> Result<()> {
        let conn = self.db.connect()?;
        conn.query("SELECT 1", ()).await?;
        Ok(())
    }
}
