//! Per-source adapters into the unified candidate shape.
//!
//! One pure function per stream. Each computes the deterministic composite
//! id, fills the display projection (placeholders for missing fields, a
//! partial record is never dropped), and measures queue age from the
//! source's own detection timestamp.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::db::{DedupCandidateRow, EngineDecisionRow, PartySnapshot, PreventionEventRow};
use crate::models::{
    CandidateSource, CompositeId, DuplicateCandidate, EntityAttributes, EntityKind,
};
use crate::scoring;

/// Name similarity at which the prevention stream's field score reads
/// "agree" in the review UI.
const NAME_AGREE_DISPLAY: f64 = 0.85;

fn attributes(snapshot: &PartySnapshot) -> EntityAttributes {
    EntityAttributes {
        id: snapshot.id.clone(),
        name: scoring::display_label(snapshot.name.as_deref()),
        email: snapshot.email.clone(),
        phone: snapshot.phone.clone(),
        address: snapshot.address.clone(),
        cat_count: snapshot.cat_count,
        request_count: snapshot.request_count,
    }
}

fn agree(flag: bool) -> String {
    if flag { "agree" } else { "disagree" }.to_string()
}

pub fn normalize_dedup(row: &DedupCandidateRow, now: DateTime<Utc>) -> DuplicateCandidate {
    let composite = CompositeId::Dedup {
        left_id: row.left.id.clone(),
        right_id: row.right.id.clone(),
    };

    DuplicateCandidate {
        composite_id: composite.to_string(),
        source: CandidateSource::Dedup,
        entity: row.entity,
        tier: row.tier,
        similarity: row.name_similarity,
        match_probability: scoring::unified_probability(None, None, row.tier),
        comparison_vector: None,
        left: attributes(&row.left),
        right: attributes(&row.right),
        detected_at: row.detected_at,
        queue_hours: scoring::queue_hours(row.detected_at, now),
    }
}

pub fn normalize_prevention(row: &PreventionEventRow, now: DateTime<Utc>) -> DuplicateCandidate {
    let composite = CompositeId::Prevention {
        event_id: row.id.clone(),
    };

    let mut vector = BTreeMap::new();
    vector.insert(
        "name_similar_high".to_string(),
        agree(row.name_similarity >= NAME_AGREE_DISPLAY),
    );
    vector.insert("address_exact".to_string(), agree(row.address_exact));

    DuplicateCandidate {
        composite_id: composite.to_string(),
        source: CandidateSource::Prevention,
        entity: EntityKind::Person,
        tier: 4,
        similarity: row.name_similarity,
        match_probability: scoring::unified_probability(None, None, 4),
        comparison_vector: Some(vector),
        left: attributes(&row.matched),
        right: attributes(&row.incoming),
        detected_at: row.detected_at,
        queue_hours: scoring::queue_hours(row.detected_at, now),
    }
}

pub fn normalize_engine(row: &EngineDecisionRow, now: DateTime<Utc>) -> DuplicateCandidate {
    let composite = CompositeId::Engine {
        decision_id: row.id.clone(),
    };

    let match_probability =
        scoring::unified_probability(row.match_probability, row.top_candidate_score, 6);

    // The engine wrote the vector as JSON; a corrupt blob degrades to no
    // detail rather than dropping the candidate.
    let comparison_vector = row
        .comparison_vector
        .as_deref()
        .and_then(|raw| serde_json::from_str::<BTreeMap<String, String>>(raw).ok())
        .filter(|vector| !vector.is_empty());

    DuplicateCandidate {
        composite_id: composite.to_string(),
        source: CandidateSource::Engine,
        entity: EntityKind::Person,
        tier: 6,
        similarity: match_probability.unwrap_or(0.0),
        match_probability,
        comparison_vector,
        left: attributes(&row.left),
        right: attributes(&row.right),
        detected_at: row.detected_at,
        queue_hours: scoring::queue_hours(row.detected_at, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(id: &str, name: Option<&str>) -> PartySnapshot {
        PartySnapshot {
            id: id.to_string(),
            name: name.map(String::from),
            email: None,
            phone: None,
            address: None,
            cat_count: 0,
            request_count: 0,
        }
    }

    fn dedup_row(tier: u8) -> DedupCandidateRow {
        DedupCandidateRow {
            left: snapshot("P1", Some("Ada Feral")),
            right: snapshot("P2", None),
            entity: EntityKind::Person,
            tier,
            name_similarity: 0.97,
            detected_at: Utc::now() - Duration::hours(12),
            status: crate::models::CandidateStatus::Pending,
        }
    }

    #[test]
    fn dedup_composite_id_is_deterministic() {
        let row = dedup_row(1);
        let now = Utc::now();
        let first = normalize_dedup(&row, now);
        let second = normalize_dedup(&row, now);
        assert_eq!(first.composite_id, "dedup:P1:P2");
        assert_eq!(first.composite_id, second.composite_id);
    }

    #[test]
    fn dedup_tier1_estimates_display_probability() {
        let unified = normalize_dedup(&dedup_row(1), Utc::now());
        assert_eq!(unified.match_probability, Some(0.99));
        assert_eq!(unified.similarity, 0.97);
        assert!(unified.comparison_vector.is_none());
    }

    #[test]
    fn missing_name_becomes_placeholder() {
        let unified = normalize_dedup(&dedup_row(5), Utc::now());
        assert_eq!(unified.left.name, "Ada Feral");
        assert_eq!(unified.right.name, scoring::MISSING_NAME_LABEL);
    }

    #[test]
    fn queue_hours_come_from_detection_time() {
        let row = dedup_row(1);
        let unified = normalize_dedup(&row, Utc::now());
        assert!((unified.queue_hours - 12.0).abs() < 0.1);
    }

    #[test]
    fn prevention_normalizes_to_tier_4_with_field_scores() {
        let row = PreventionEventRow {
            id: "E7".into(),
            matched: snapshot("P1", Some("Maria Lopez")),
            incoming: snapshot("P9", Some("Mariah Lopez")),
            name_similarity: 0.93,
            address_exact: true,
            detected_at: Utc::now() - Duration::hours(2),
            status: crate::models::CandidateStatus::Pending,
        };

        let unified = normalize_prevention(&row, Utc::now());
        assert_eq!(unified.composite_id, "prevention:E7");
        assert_eq!(unified.tier, 4);
        assert_eq!(unified.match_probability, Some(0.85));
        let vector = unified.comparison_vector.expect("field scores");
        assert_eq!(vector["name_similar_high"], "agree");
        assert_eq!(vector["address_exact"], "agree");
    }

    fn engine_row(
        match_probability: Option<f64>,
        top_candidate_score: Option<f64>,
        vector: Option<&str>,
    ) -> EngineDecisionRow {
        EngineDecisionRow {
            id: "D7".into(),
            left: snapshot("P1", Some("Ada Feral")),
            right: snapshot("P2", Some("Adah Ferall")),
            match_probability,
            top_candidate_score,
            comparison_vector: vector.map(String::from),
            detected_at: Utc::now() - Duration::hours(1),
            status: crate::models::CandidateStatus::Pending,
        }
    }

    #[test]
    fn engine_model_probability_takes_precedence() {
        let unified = normalize_engine(&engine_row(Some(0.91), Some(0.62), None), Utc::now());
        assert_eq!(unified.tier, 6);
        assert_eq!(unified.match_probability, Some(0.91));
        assert_eq!(unified.similarity, 0.91);
    }

    #[test]
    fn engine_falls_back_to_legacy_top_candidate_score() {
        let unified = normalize_engine(&engine_row(None, Some(0.62), None), Utc::now());
        assert_eq!(unified.composite_id, "engine:D7");
        assert_eq!(unified.match_probability, Some(0.62));
        assert_eq!(unified.similarity, 0.62);
    }

    #[test]
    fn engine_with_no_scores_stays_displayable() {
        let unified = normalize_engine(&engine_row(None, None, None), Utc::now());
        assert_eq!(unified.match_probability, None);
        assert_eq!(unified.similarity, 0.0);
    }

    #[test]
    fn engine_parses_comparison_vector() {
        let unified = normalize_engine(
            &engine_row(
                Some(0.5),
                None,
                Some(r#"{"name_similar_high":"agree","phone_exact":"disagree"}"#),
            ),
            Utc::now(),
        );
        let vector = unified.comparison_vector.expect("vector");
        assert_eq!(vector["name_similar_high"], "agree");
        assert_eq!(vector["phone_exact"], "disagree");
    }

    #[test]
    fn engine_tolerates_corrupt_comparison_vector() {
        let unified = normalize_engine(&engine_row(Some(0.5), None, Some("not json")), Utc::now());
        assert!(unified.comparison_vector.is_none());

        let unified = normalize_engine(&engine_row(Some(0.5), None, Some("{}")), Utc::now());
        assert!(unified.comparison_vector.is_none());
    }
}
