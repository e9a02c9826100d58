//! Review queue assembly: three independent candidate streams, one page.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use super::normalize::{normalize_dedup, normalize_engine, normalize_prevention};
use crate::config::QueueConfig;
use crate::db::MatchingOracle;
use crate::error::Result;
use crate::models::{DuplicateCandidate, Pagination, QueueFilter, QueueStats};

/// One assembled page of the review queue.
#[derive(Debug, Clone)]
pub struct QueuePage {
    pub items: Vec<DuplicateCandidate>,
    pub stats: QueueStats,
    /// Diagnostics for sources that contributed nothing this build.
    pub notes: Vec<String>,
    pub pagination: Pagination,
}

enum SourceOutcome {
    /// Filtered out before fetching; the source does not participate.
    Skipped,
    Fetched(Vec<DuplicateCandidate>),
    /// Fetch failed or timed out; the queue degrades instead of failing.
    Unavailable(String),
}

#[derive(Clone)]
pub struct ReviewQueueService {
    db: Arc<dyn MatchingOracle>,
    default_limit: u32,
    max_limit: u32,
    source_timeout: Duration,
}

impl ReviewQueueService {
    pub fn new(db: Arc<dyn MatchingOracle>, config: &QueueConfig) -> Self {
        Self {
            db,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
            source_timeout: Duration::from_secs(config.source_timeout_secs),
        }
    }

    /// Assemble one queue page.
    ///
    /// The three source fetches are independent and side-effect free, so
    /// they run concurrently; each is isolated behind its own timeout. A
    /// down source contributes a note instead of failing the build.
    /// `limit`/`offset` bound each source's request, the merged result is
    /// sorted oldest-waiting-first and truncated to `limit`.
    pub async fn build(
        &self,
        filter: QueueFilter,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<QueuePage> {
        let limit = limit.unwrap_or(self.default_limit).clamp(1, self.max_limit);

        let (dedup, prevention, engine) = tokio::join!(
            self.fetch_dedup(filter, limit, offset),
            self.fetch_prevention(filter, limit, offset),
            self.fetch_engine(filter, limit, offset),
        );

        let mut items: Vec<DuplicateCandidate> = Vec::new();
        let mut notes = Vec::new();
        let mut fetched_sources = 0u32;

        for outcome in [dedup, prevention, engine] {
            match outcome {
                SourceOutcome::Skipped => {}
                SourceOutcome::Fetched(mut batch) => {
                    fetched_sources += 1;
                    items.append(&mut batch);
                }
                SourceOutcome::Unavailable(note) => {
                    warn!("{note}");
                    notes.push(note);
                }
            }
        }

        items.sort_by(|a, b| {
            b.queue_hours
                .partial_cmp(&a.queue_hours)
                .unwrap_or(Ordering::Equal)
        });
        items.truncate(limit as usize);

        let stats = self.stats().await?;

        let pagination = Pagination {
            limit,
            offset,
            returned: items.len() as u32,
            approximate: fetched_sources > 1,
        };

        Ok(QueuePage {
            items,
            stats,
            notes,
            pagination,
        })
    }

    /// Pending counts per tier across all sources. Independent of any
    /// page: a `limit=1` request still reports the full numbers. A down
    /// source simply contributes zero.
    pub async fn stats(&self) -> Result<QueueStats> {
        let (dedup, prevention, engine) = tokio::join!(
            self.db.dedup_stats(),
            self.db.prevention_pending_count(),
            self.db.engine_pending_count(),
        );

        let mut stats = QueueStats::default();

        match dedup {
            Ok(counts) => {
                for tier_count in counts {
                    stats.add_tier(tier_count.tier, tier_count.count);
                }
            }
            Err(e) => warn!("dedup stats unavailable: {e}"),
        }
        match prevention {
            Ok(count) => stats.add_tier(4, count),
            Err(e) => warn!("prevention stats unavailable: {e}"),
        }
        match engine {
            Ok(count) => stats.add_tier(6, count),
            Err(e) => warn!("engine stats unavailable: {e}"),
        }

        Ok(stats)
    }

    async fn fetch_dedup(&self, filter: QueueFilter, limit: u32, offset: u32) -> SourceOutcome {
        if !filter.includes_dedup() {
            return SourceOutcome::Skipped;
        }
        let now = Utc::now();
        match tokio::time::timeout(
            self.source_timeout,
            self.db
                .fetch_dedup_candidates(filter.dedup_tier(), limit, offset),
        )
        .await
        {
            Err(_) => SourceOutcome::Unavailable("dedup source timed out".to_string()),
            Ok(Err(e)) => SourceOutcome::Unavailable(format!("dedup source unavailable: {e}")),
            Ok(Ok(rows)) => {
                SourceOutcome::Fetched(rows.iter().map(|row| normalize_dedup(row, now)).collect())
            }
        }
    }

    async fn fetch_prevention(
        &self,
        filter: QueueFilter,
        limit: u32,
        offset: u32,
    ) -> SourceOutcome {
        if !filter.includes_prevention() {
            return SourceOutcome::Skipped;
        }
        let now = Utc::now();
        match tokio::time::timeout(
            self.source_timeout,
            self.db.fetch_prevention_events(limit, offset),
        )
        .await
        {
            Err(_) => SourceOutcome::Unavailable("prevention source timed out".to_string()),
            Ok(Err(e)) => {
                SourceOutcome::Unavailable(format!("prevention source unavailable: {e}"))
            }
            Ok(Ok(rows)) => SourceOutcome::Fetched(
                rows.iter()
                    .map(|row| normalize_prevention(row, now))
                    .collect(),
            ),
        }
    }

    async fn fetch_engine(&self, filter: QueueFilter, limit: u32, offset: u32) -> SourceOutcome {
        if !filter.includes_engine() {
            return SourceOutcome::Skipped;
        }
        let now = Utc::now();
        match tokio::time::timeout(
            self.source_timeout,
            self.db.fetch_engine_decisions(limit, offset),
        )
        .await
        {
            Err(_) => SourceOutcome::Unavailable("engine source timed out".to_string()),
            Ok(Err(e)) => SourceOutcome::Unavailable(format!("engine source unavailable: {e}")),
            Ok(Ok(rows)) => {
                SourceOutcome::Fetched(rows.iter().map(|row| normalize_engine(row, now)).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;
    use crate::models::CandidateSource;

    fn queue_config() -> QueueConfig {
        QueueConfig {
            default_limit: 25,
            max_limit: 200,
            source_timeout_secs: 10,
        }
    }

    async fn seed_one_candidate_per_source(conn: &libsql::Connection) {
        insert_person(conn, "P1", Some("Ada"), Some("Feral"), Some("a@x.com"), None).await;
        insert_person(conn, "P2", Some("Ada"), Some("Feral"), Some("a@x.com"), None).await;
        insert_person(conn, "P3", Some("Maria"), Some("Lopez"), None, None).await;
        insert_person(conn, "P4", Some("Mariah"), Some("Lopez"), None, None).await;
        insert_person(conn, "P5", Some("Devon"), Some("Okafor"), None, None).await;
        insert_person(conn, "P6", Some("Devin"), Some("Okafor"), None, None).await;
        insert_dedup_candidate(conn, "P1", "P2", 1, 5).await;
        insert_prevention_event(conn, "E1", "P3", "P4", 10).await;
        insert_engine_decision(conn, "D1", "P5", "P6", Some(0.48), None, 1).await;
    }

    #[tokio::test]
    async fn test_build_merges_all_sources_sorted_by_age() {
        // Given one pending candidate in each source with distinct ages
        let (conn, db, _temp) = setup_test_db().await;
        seed_one_candidate_per_source(&conn).await;

        let queue = ReviewQueueService::new(db, &queue_config());

        // When building the unfiltered queue
        let page = queue.build(QueueFilter::All, None, 0).await.unwrap();

        // Then all three appear, oldest-waiting first
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].composite_id, "prevention:E1");
        assert_eq!(page.items[1].composite_id, "dedup:P1:P2");
        assert_eq!(page.items[2].composite_id, "engine:D1");
        assert!(page.notes.is_empty());
        assert!(page.pagination.approximate, "multi-source pages are approximate");
    }

    #[tokio::test]
    async fn test_tier4_filter_selects_prevention_only() {
        let (conn, db, _temp) = setup_test_db().await;
        seed_one_candidate_per_source(&conn).await;

        let queue = ReviewQueueService::new(db, &queue_config());
        let page = queue.build(QueueFilter::Tier(4), None, 0).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].source, CandidateSource::Prevention);
        assert_eq!(page.items[0].tier, 4);
        assert!(!page.pagination.approximate, "single-source page is exact");
    }

    #[tokio::test]
    async fn test_uncertain_filter_selects_engine_only() {
        let (conn, db, _temp) = setup_test_db().await;
        seed_one_candidate_per_source(&conn).await;

        let queue = ReviewQueueService::new(db, &queue_config());
        let page = queue.build(QueueFilter::Uncertain, None, 0).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].source, CandidateSource::Engine);
        assert_eq!(page.items[0].tier, 6);
    }

    #[tokio::test]
    async fn test_tier_filter_reaches_dedup_predicate() {
        let (conn, db, _temp) = setup_test_db().await;
        seed_one_candidate_per_source(&conn).await;

        let queue = ReviewQueueService::new(db, &queue_config());
        let page = queue.build(QueueFilter::Tier(1), None, 0).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].tier, 1);

        let page = queue.build(QueueFilter::Tier(3), None, 0).await.unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_limit_truncates_merged_result_but_not_stats() {
        let (conn, db, _temp) = setup_test_db().await;
        seed_one_candidate_per_source(&conn).await;

        let queue = ReviewQueueService::new(db, &queue_config());
        let page = queue.build(QueueFilter::All, Some(1), 0).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.returned, 1);
        // Stats ignore the page bounds entirely
        assert_eq!(page.stats.total, 3);
        assert_eq!(page.stats.tier1, 1);
        assert_eq!(page.stats.tier4, 1);
        assert_eq!(page.stats.tier6, 1);
    }

    #[tokio::test]
    async fn test_unavailable_source_degrades_with_note() {
        // Given the engine table has not been provisioned
        let (conn, db, _temp) = setup_test_db().await;
        seed_one_candidate_per_source(&conn).await;
        conn.execute("DROP TABLE engine_decisions", ()).await.unwrap();

        let queue = ReviewQueueService::new(db, &queue_config());

        // When building the queue
        let page = queue.build(QueueFilter::All, None, 0).await.unwrap();

        // Then the other two sources still contribute, plus a note
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.notes.len(), 1);
        assert!(page.notes[0].contains("engine source unavailable"));
        // And the totals reflect only the available sources
        assert_eq!(page.stats.total, 2);
        assert_eq!(page.stats.tier6, 0);
    }

    #[tokio::test]
    async fn test_engine_fallback_probability_surfaces_in_queue() {
        // Given an engine decision with no model probability but a legacy
        // top-candidate score of 0.62
        let (conn, db, _temp) = setup_test_db().await;
        insert_person(&conn, "P5", Some("Devon"), Some("Okafor"), None, None).await;
        insert_person(&conn, "P6", Some("Devin"), Some("Okafor"), None, None).await;
        insert_engine_decision(&conn, "D7", "P5", "P6", None, Some(0.62), 1).await;

        let queue = ReviewQueueService::new(db, &queue_config());
        let page = queue.build(QueueFilter::Uncertain, None, 0).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].composite_id, "engine:D7");
        assert_eq!(page.items[0].tier, 6);
        assert_eq!(page.items[0].match_probability, Some(0.62));
    }

    #[tokio::test]
    async fn test_composite_ids_stable_across_rebuilds() {
        let (conn, db, _temp) = setup_test_db().await;
        seed_one_candidate_per_source(&conn).await;

        let queue = ReviewQueueService::new(db, &queue_config());
        let first = queue.build(QueueFilter::All, None, 0).await.unwrap();
        let second = queue.build(QueueFilter::All, None, 0).await.unwrap();

        let first_ids: Vec<_> = first.items.iter().map(|c| &c.composite_id).collect();
        let second_ids: Vec<_> = second.items.iter().map(|c| &c.composite_id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[tokio::test]
    async fn test_tiers_and_probabilities_stay_in_range() {
        let (conn, db, _temp) = setup_test_db().await;
        seed_one_candidate_per_source(&conn).await;

        let queue = ReviewQueueService::new(db, &queue_config());
        let page = queue.build(QueueFilter::All, None, 0).await.unwrap();

        for item in &page.items {
            assert!((1..=6).contains(&item.tier), "tier {}", item.tier);
            if let Some(p) = item.match_probability {
                assert!((0.0..=1.0).contains(&p), "probability {p}");
            }
        }
    }
}
