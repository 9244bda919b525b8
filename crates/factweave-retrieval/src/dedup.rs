//! Fact deduplication and confidence filtering.
//!
//! Facts from multiple sub-queries or fallback strategies frequently repeat
//! the same statement with minor formatting differences. A normalized
//! prefix of the fact text serves as the deduplication key.

use std::collections::HashSet;

use factweave_core::{defaults, Fact};

/// Deduplication key: first `FINGERPRINT_LEN` characters of the fact text,
/// lower-cased with whitespace collapsed.
pub fn fingerprint(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(defaults::FINGERPRINT_LEN)
        .collect()
}

/// Collapse facts sharing a fingerprint, keeping the first occurrence and
/// preserving input order otherwise.
pub fn dedup_facts(facts: Vec<Fact>) -> Vec<Fact> {
    let mut seen = HashSet::new();
    facts
        .into_iter()
        .filter(|fact| seen.insert(fingerprint(&fact.text)))
        .collect()
}

/// Drop facts below the confidence threshold. The boundary is inclusive;
/// a missing score counts as 0 and survives only a zero threshold.
pub fn filter_by_threshold(facts: Vec<Fact>, threshold: f64) -> Vec<Fact> {
    facts
        .into_iter()
        .filter(|fact| fact.confidence() >= threshold)
        .collect()
}

/// Average confidence over facts; 0 when none survive.
pub fn average_confidence(facts: &[Fact]) -> f64 {
    if facts.is_empty() {
        return 0.0;
    }
    facts.iter().map(Fact::confidence).sum::<f64>() / facts.len() as f64
}
