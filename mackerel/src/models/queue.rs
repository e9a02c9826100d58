//! Review queue filters, stats, and pagination.

use serde::{Deserialize, Serialize};

use crate::error::MackerelError;

/// Tier-group filter for the review queue.
///
/// `tier1`..`tier5` select one deterministic tier, `uncertain` selects the
/// model-scored stream, `all` (or no filter) selects everything. Tier 4 is
/// sourced exclusively from the prevention stream, so `tier4` gates that
/// source rather than the dedup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFilter {
    All,
    Tier(u8),
    Uncertain,
}

impl QueueFilter {
    pub fn parse(raw: Option<&str>) -> Result<Self, MackerelError> {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Ok(QueueFilter::All),
            Some("uncertain") => Ok(QueueFilter::Uncertain),
            Some(tier) if tier.starts_with("tier") => match tier[4..].parse::<u8>() {
                Ok(n @ 1..=5) => Ok(QueueFilter::Tier(n)),
                _ => Err(MackerelError::Validation(format!(
                    "unknown queue filter '{tier}'"
                ))),
            },
            Some(other) => Err(MackerelError::Validation(format!(
                "unknown queue filter '{other}'"
            ))),
        }
    }

    /// Tier predicate to push into the dedup source's fetch, when that
    /// source participates at all.
    pub fn dedup_tier(&self) -> Option<u8> {
        match self {
            QueueFilter::Tier(n) => Some(*n),
            _ => None,
        }
    }

    pub fn includes_dedup(&self) -> bool {
        match self {
            QueueFilter::All => true,
            QueueFilter::Tier(n) => *n != 4,
            QueueFilter::Uncertain => false,
        }
    }

    pub fn includes_prevention(&self) -> bool {
        matches!(self, QueueFilter::All | QueueFilter::Tier(4))
    }

    pub fn includes_engine(&self) -> bool {
        matches!(self, QueueFilter::All | QueueFilter::Uncertain)
    }
}

/// Pending counts per tier, computed independently of any queue page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total: u64,
    pub tier1: u64,
    pub tier2: u64,
    pub tier3: u64,
    pub tier4: u64,
    pub tier5: u64,
    pub tier6: u64,
}

impl QueueStats {
    pub fn add_tier(&mut self, tier: u8, count: u64) {
        match tier {
            1 => self.tier1 += count,
            2 => self.tier2 += count,
            3 => self.tier3 += count,
            4 => self.tier4 += count,
            5 => self.tier5 += count,
            6 => self.tier6 += count,
            _ => return,
        }
        self.total += count;
    }
}

/// Pagination echo for a queue page.
///
/// `limit`/`offset` bound each source's request before merging; the merged
/// result is truncated to `limit` afterwards. When more than one source is
/// active the "has more" signal is therefore approximate, and `approximate`
/// says so. The queue exists for triage, not exhaustive enumeration.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub returned: u32,
    pub approximate: bool,
}
