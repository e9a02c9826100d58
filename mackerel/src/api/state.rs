use std::sync::Arc;

use crate::config::Config;
use crate::db::MatchingOracle;
use crate::services::{DetectionService, ResolutionService, ReviewQueueService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn MatchingOracle>,
    pub queue: ReviewQueueService,
    pub resolution: ResolutionService,
    pub detection: DetectionService,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn MatchingOracle>) -> Self {
        let queue = ReviewQueueService::new(db.clone(), &config.queue);
        let resolution = ResolutionService::new(db.clone(), &config.resolution);
        let detection = DetectionService::new(db.clone(), config.matching.clone());
        let config = Arc::new(config);

        Self {
            config,
            db,
            queue,
            resolution,
            detection,
        }
    }
}
