//! Deterministic pair rules for the detection scan.
//!
//! Pure domain logic, no database access: normalize contact keys, score
//! name similarity, and decide which tier rule (if any) a pair of live
//! person records fires. Tier 4 (name + address agreement) is deliberately
//! absent: those candidates are produced at intake time by the prevention
//! stream, and generating them here as well would double-queue the same
//! physical collision.

use crate::config::MatchingConfig;
use crate::db::{DetectedPair, PersonRow};

/// Everything the scan concluded about one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSignal {
    pub tier: u8,
    pub name_similarity: f64,
    pub shared_email: Option<String>,
    pub shared_phone: Option<String>,
}

/// Lowercased, trimmed email; `None` when empty.
pub fn normalize_email(raw: Option<&str>) -> Option<String> {
    let email = raw?.trim().to_lowercase();
    if email.is_empty() {
        None
    } else {
        Some(email)
    }
}

/// Digits only; requires at least 7 digits to count as a phone number.
/// An 11-digit number with a leading country code 1 is reduced to 10.
pub fn normalize_phone(raw: Option<&str>) -> Option<String> {
    let digits: String = raw?.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = match digits.strip_prefix('1') {
        Some(rest) if digits.len() == 11 => rest.to_string(),
        _ => digits,
    };
    if digits.len() < 7 {
        None
    } else {
        Some(digits)
    }
}

/// Full display name of a person record, `None` when both parts are blank.
pub fn full_name(person: &PersonRow) -> Option<String> {
    let first = person.first_name.as_deref().unwrap_or("").trim();
    let last = person.last_name.as_deref().unwrap_or("").trim();
    let joined = format!("{first} {last}");
    let joined = joined.trim();
    if joined.is_empty() {
        None
    } else {
        Some(joined.to_string())
    }
}

/// Jaro-Winkler similarity of two names, case- and whitespace-insensitive.
/// Zero when either side has no name at all.
pub fn name_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => {
            let a = a.trim().to_lowercase();
            let b = b.trim().to_lowercase();
            if a.is_empty() || b.is_empty() {
                0.0
            } else {
                strsim::jaro_winkler(&a, &b)
            }
        }
        _ => 0.0,
    }
}

/// Apply the tier rules to one pair. Rules are checked strongest first;
/// the first that fires decides the tier.
pub fn evaluate_pair(a: &PersonRow, b: &PersonRow, cfg: &MatchingConfig) -> Option<PairSignal> {
    let name_a = full_name(a);
    let name_b = full_name(b);
    let similarity = name_similarity(name_a.as_deref(), name_b.as_deref());

    let email_a = normalize_email(a.email.as_deref());
    let email_b = normalize_email(b.email.as_deref());
    if let (Some(ea), Some(eb)) = (&email_a, &email_b) {
        if ea == eb {
            return Some(PairSignal {
                tier: 1,
                name_similarity: similarity,
                shared_email: Some(ea.clone()),
                shared_phone: None,
            });
        }
    }

    let phone_a = normalize_phone(a.phone.as_deref());
    let phone_b = normalize_phone(b.phone.as_deref());
    if let (Some(pa), Some(pb)) = (&phone_a, &phone_b) {
        if pa == pb {
            let tier = if similarity >= cfg.name_agreement_threshold {
                2
            } else {
                3
            };
            return Some(PairSignal {
                tier,
                name_similarity: similarity,
                shared_email: None,
                shared_phone: Some(pa.clone()),
            });
        }
    }

    if similarity >= cfg.weak_name_threshold {
        return Some(PairSignal {
            tier: 5,
            name_similarity: similarity,
            shared_email: None,
            shared_phone: None,
        });
    }

    None
}

/// Cross-match every unique pair of live persons against the tier rules.
///
/// The earlier-created record becomes the left (kept-by-default) side, so
/// the pair key is deterministic across scans. Only unique pairs are
/// produced, with no reversals and no self-matches.
pub fn find_duplicate_pairs(persons: &[PersonRow], cfg: &MatchingConfig) -> Vec<DetectedPair> {
    let mut pairs = Vec::new();

    for i in 0..persons.len() {
        for j in (i + 1)..persons.len() {
            let (a, b) = (&persons[i], &persons[j]);
            if let Some(signal) = evaluate_pair(a, b, cfg) {
                let (left, right) = if (a.created_at, &a.id) <= (b.created_at, &b.id) {
                    (a, b)
                } else {
                    (b, a)
                };
                pairs.push(DetectedPair {
                    left_id: left.id.clone(),
                    right_id: right.id.clone(),
                    tier: signal.tier,
                    name_similarity: signal.name_similarity,
                    shared_email: signal.shared_email,
                    shared_phone: signal.shared_phone,
                });
            }
        }
    }

    pairs
}
