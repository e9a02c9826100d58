mod detection;
mod normalize;
mod queue;
mod resolution;

pub use detection::{DetectionService, ScanSummary};
pub use normalize::{normalize_dedup, normalize_engine, normalize_prevention};
pub use queue::{QueuePage, ReviewQueueService};
pub use resolution::{BatchItemResult, ResolutionService};
