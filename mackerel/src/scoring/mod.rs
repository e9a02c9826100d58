//! Score model: raw match evidence to display probability and labels.
//!
//! Pure functions, no I/O. The tier itself is assigned by whichever matching
//! rule fired upstream; this module only decides what probability to show
//! when none was computed, which computed score wins when several are
//! present, and how a record with missing fields stays displayable.

use chrono::{DateTime, Utc};

/// Placeholder shown for a record with no usable name. Candidates with a
/// nameless side must still be orderable and displayable.
pub const MISSING_NAME_LABEL: &str = "(no name)";

/// Estimated same-entity probability for a deterministic tier.
///
/// A presentation aid only; it must never feed an automatic resolution.
/// Tier 4 (name + address agreement) outranks tier 3 despite its number.
/// Tier 6 carries a genuine model score instead, so it has no estimate here.
pub fn tier_probability(tier: u8) -> Option<f64> {
    match tier {
        1 => Some(0.99),
        2 => Some(0.90),
        3 => Some(0.75),
        4 => Some(0.85),
        5 => Some(0.60),
        _ => None,
    }
}

/// Pick the probability to display for a candidate.
///
/// Model probability takes precedence; the legacy top-candidate score is
/// retained only as a fallback when the model score is absent; the tier
/// estimate covers pairs nothing scored. The result is clamped to [0, 1].
pub fn unified_probability(
    model_probability: Option<f64>,
    legacy_score: Option<f64>,
    tier: u8,
) -> Option<f64> {
    model_probability
        .or(legacy_score)
        .or_else(|| tier_probability(tier))
        .map(clamp01)
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Display label for a possibly-missing name.
pub fn display_label(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => MISSING_NAME_LABEL.to_string(),
    }
}

/// Wall-clock hours a candidate has waited since its source detected it.
///
/// Measured from the source's own timestamp, so rebuilding the queue never
/// makes a candidate look fresh. Clock skew can put `detected_at` slightly
/// in the future; clamp to zero rather than report a negative age.
pub fn queue_hours(detected_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - detected_at).num_seconds();
    if seconds <= 0 {
        0.0
    } else {
        seconds as f64 / 3600.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn tier_probability_fixed_lookup() {
        assert_eq!(tier_probability(1), Some(0.99));
        assert_eq!(tier_probability(2), Some(0.90));
        assert_eq!(tier_probability(3), Some(0.75));
        assert_eq!(tier_probability(4), Some(0.85));
        assert_eq!(tier_probability(5), Some(0.60));
        assert_eq!(tier_probability(6), None);
        assert_eq!(tier_probability(0), None);
    }

    #[test]
    fn tier4_outranks_tier3() {
        assert!(tier_probability(4).unwrap() > tier_probability(3).unwrap());
    }

    #[test]
    fn model_probability_wins_over_legacy_score() {
        assert_eq!(unified_probability(Some(0.91), Some(0.62), 6), Some(0.91));
    }

    #[test]
    fn legacy_score_is_the_fallback() {
        assert_eq!(unified_probability(None, Some(0.62), 6), Some(0.62));
    }

    #[test]
    fn tier_estimate_covers_unscored_pairs() {
        assert_eq!(unified_probability(None, None, 1), Some(0.99));
        assert_eq!(unified_probability(None, None, 6), None);
    }

    #[test]
    fn probabilities_are_clamped() {
        assert_eq!(unified_probability(Some(1.7), None, 6), Some(1.0));
        assert_eq!(unified_probability(Some(-0.2), None, 6), Some(0.0));
    }

    #[test]
    fn display_label_substitutes_placeholder() {
        assert_eq!(display_label(Some("Ada Feral")), "Ada Feral");
        assert_eq!(display_label(Some("  ")), MISSING_NAME_LABEL);
        assert_eq!(display_label(Some("")), MISSING_NAME_LABEL);
        assert_eq!(display_label(None), MISSING_NAME_LABEL);
    }

    #[test]
    fn queue_hours_measures_from_detection() {
        let now = Utc::now();
        let detected = now - Duration::hours(36);
        let hours = queue_hours(detected, now);
        assert!((hours - 36.0).abs() < 0.01);
    }

    #[test]
    fn queue_hours_clamps_future_detection() {
        let now = Utc::now();
        let detected = now + Duration::minutes(5);
        assert_eq!(queue_hours(detected, now), 0.0);
    }
}
