use std::sync::Arc;

use tracing::{debug, info};

use crate::config::MatchingConfig;
use crate::db::MatchingOracle;
use crate::error::Result;
use crate::matching;

/// What one scan pass did.
#[derive(Debug, Clone, Copy)]
pub struct ScanSummary {
    pub pairs_evaluated: u64,
    pub candidates_created: u64,
}

/// Runs the deterministic duplicate-detection pass over live persons.
#[derive(Clone)]
pub struct DetectionService {
    db: Arc<dyn MatchingOracle>,
    config: MatchingConfig,
}

impl DetectionService {
    pub fn new(db: Arc<dyn MatchingOracle>, config: MatchingConfig) -> Self {
        Self { db, config }
    }

    /// Run a single scan pass.
    ///
    /// Cross-matches every unique pair of live persons against the tier
    /// rules and queues the hits. The pair key is the candidate identity,
    /// so re-running the scan never duplicates queue rows.
    pub async fn run_once(&self) -> Result<ScanSummary> {
        info!("Starting duplicate-detection scan");

        let persons = self.db.list_live_persons().await?;
        let count = persons.len() as u64;
        let pairs_evaluated = count * count.saturating_sub(1) / 2;

        let pairs = matching::find_duplicate_pairs(&persons, &self.config);
        if pairs.is_empty() {
            info!("Scan complete: {} persons, no rule hits", count);
            return Ok(ScanSummary {
                pairs_evaluated,
                candidates_created: 0,
            });
        }

        debug!("Scan matched {} pairs, queueing", pairs.len());
        let candidates_created = self.db.insert_dedup_candidates(&pairs).await?;

        info!(
            "Scan complete: {} persons, {} rule hits, {} new candidates",
            count,
            pairs.len(),
            candidates_created
        );

        Ok(ScanSummary {
            pairs_evaluated,
            candidates_created,
        })
    }

    pub fn interval_secs(&self) -> u64 {
        self.config.scan_interval_secs
    }
}
