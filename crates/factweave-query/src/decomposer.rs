//! Query decomposition into prioritized sub-queries.
//!
//! Signal priority when several are present:
//! comparison > multiple questions > multi-part > bare conjunction.

use once_cell::sync::Lazy;
use regex::Regex;

use factweave_core::{defaults, SubQuery, SubQueryKind};

static COMPARISON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:vs\.?|versus|compare|difference between|better than|pros and cons)\b")
        .unwrap()
});

/// Ordered entity-pair extraction attempts for comparison queries.
static VS_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+(?:vs\.?|versus)\s+(.+?)\??$").unwrap());

static COMPARE_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcompare\s+(.+?)\s+(?:and|with|to)\s+(.+?)\??$").unwrap());

static DIFFERENCE_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdifference\s+between\s+(.+?)\s+and\s+(.+?)\??$").unwrap());

/// Capitalized phrase, e.g. "Docker Swarm".
static CAPITALIZED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Za-z0-9]*(?:\s+[A-Z][A-Za-z0-9]*)*\b").unwrap());

static MULTI_PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:;|\band also\b|\badditionally\b|\bfurthermore\b|\bas well as\b|\bsecondly\b)\s*")
        .unwrap()
});

/// Gate before attempting decomposition, to avoid overhead on short
/// queries: length and word-count minimums plus at least one signal.
pub fn should_decompose(query: &str) -> bool {
    let trimmed = query.trim();
    if trimmed.len() < defaults::DECOMPOSE_MIN_CHARS
        || trimmed.split_whitespace().count() < defaults::DECOMPOSE_MIN_WORDS
    {
        return false;
    }
    has_signal(trimmed)
}

fn has_signal(query: &str) -> bool {
    COMPARISON_RE.is_match(query)
        || question_fragments(query).len() >= 2
        || MULTI_PART_RE.is_match(query)
        || query.contains(" and ")
}

/// Decompose a query into sub-queries.
///
/// Always returns at least one entry; a query with no usable structure
/// degrades to
/// a single sub-query carrying the original text.
pub fn decompose(query: &str) -> Vec<SubQuery> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return vec![SubQuery::original(query)];
    }

    if COMPARISON_RE.is_match(trimmed) {
        if let Some(entities) = extract_comparison_entities(trimmed) {
            return entities
                .into_iter()
                .enumerate()
                .map(|(i, entity)| SubQuery {
                    text: format!("Information about {entity}"),
                    priority: i as u32 + 1,
                    kind: SubQueryKind::ComparisonPart,
                })
                .collect();
        }
    }

    let questions = question_fragments(trimmed);
    if questions.len() >= 2 {
        return questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| SubQuery {
                text: format!("{q}?"),
                priority: i as u32 + 1,
                kind: SubQueryKind::ChainPart,
            })
            .collect();
    }

    if MULTI_PART_RE.is_match(trimmed) {
        let parts: Vec<&str> = MULTI_PART_RE
            .split(trimmed)
            .map(str::trim)
            .filter(|p| p.len() >= defaults::MIN_QUESTION_FRAGMENT_LEN)
            .collect();
        if parts.len() >= 2 {
            return parts
                .into_iter()
                .enumerate()
                .map(|(i, p)| SubQuery {
                    text: p.to_string(),
                    priority: i as u32 + 1,
                    kind: SubQueryKind::ChainPart,
                })
                .collect();
        }
    }

    if let Some((left, right)) = conjunction_parts(trimmed) {
        return vec![
            SubQuery {
                text: left,
                priority: 1,
                kind: SubQueryKind::ChainPart,
            },
            SubQuery {
                text: right,
                priority: 2,
                kind: SubQueryKind::ChainPart,
            },
        ];
    }

    vec![SubQuery::original(trimmed)]
}

/// `?`-terminated clauses of at least the minimum usable length.
fn question_fragments(query: &str) -> Vec<String> {
    if query.matches('?').count() < 2 {
        return vec![];
    }
    query
        .split('?')
        .map(str::trim)
        .filter(|f| f.len() >= defaults::MIN_QUESTION_FRAGMENT_LEN)
        .map(str::to_string)
        .collect()
}

/// Entity pair for a comparison, via ordered pattern attempts with a
/// capitalized-phrase fallback.
fn extract_comparison_entities(query: &str) -> Option<Vec<String>> {
    for pattern in [&*VS_PAIR_RE, &*COMPARE_PAIR_RE, &*DIFFERENCE_PAIR_RE] {
        if let Some(caps) = pattern.captures(query) {
            let a = clean_entity(&caps[1]);
            let b = clean_entity(&caps[2]);
            if !a.is_empty() && !b.is_empty() {
                return Some(vec![a, b]);
            }
        }
    }

    let capitalized: Vec<String> = CAPITALIZED_RE
        .find_iter(query)
        .map(|m| m.as_str().to_string())
        .filter(|p| !is_question_word(p))
        .take(2)
        .collect();
    if capitalized.len() == 2 {
        return Some(capitalized);
    }
    None
}

/// Strip leading question scaffolding and trailing punctuation from an
/// extracted entity.
fn clean_entity(raw: &str) -> String {
    let stripped = raw.trim().trim_end_matches(['?', '.', ',', '!']);
    let lowered = stripped.to_lowercase();
    for prefix in ["what is ", "what are ", "which is ", "tell me about ", "is "] {
        if lowered.starts_with(prefix) {
            return stripped[prefix.len()..].trim().to_string();
        }
    }
    stripped.to_string()
}

fn is_question_word(word: &str) -> bool {
    matches!(
        word,
        "What" | "Which" | "How" | "Why" | "When" | "Where" | "Who" | "Is" | "Are" | "The"
    )
}

/// Split a bare "A and B" conjunction when both sides are substantial.
fn conjunction_parts(query: &str) -> Option<(String, String)> {
    let (left, right) = query.split_once(" and ")?;
    let left = left.trim();
    let right = right.trim().trim_end_matches('?');
    if left.len() >= defaults::MIN_QUESTION_FRAGMENT_LEN
        && right.len() >= defaults::MIN_QUESTION_FRAGMENT_LEN
    {
        Some((left.to_string(), right.to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vs_comparison_two_subqueries() {
        let subs = decompose("Docker vs Kubernetes");
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].priority, 1);
        assert_eq!(subs[1].priority, 2);
        assert!(subs[0].text.contains("Docker"));
        assert!(subs[1].text.contains("Kubernetes"));
        assert_eq!(subs[0].kind, SubQueryKind::ComparisonPart);
    }

    #[test]
    fn test_compare_and_pattern() {
        let subs = decompose("compare PostgreSQL and MySQL for analytics");
        assert_eq!(subs.len(), 2);
        assert!(subs[0].text.contains("PostgreSQL"));
        assert!(subs[1].text.contains("MySQL"));
    }

    #[test]
    fn test_difference_between_pattern() {
        let subs = decompose("what is the difference between TCP and UDP?");
        assert_eq!(subs.len(), 2);
        assert!(subs[0].text.contains("TCP"));
        assert!(subs[1].text.contains("UDP"));
    }

    #[test]
    fn test_better_than_falls_back_to_capitalized_phrases() {
        let subs = decompose("is Terraform better than Pulumi");
        assert_eq!(subs.len(), 2);
        assert!(subs[0].text.contains("Terraform"));
        assert!(subs[1].text.contains("Pulumi"));
    }

    #[test]
    fn test_question_chain_split() {
        let subs = decompose("What is the deploy process? How do rollbacks work?");
        assert_eq!(subs.len(), 2);
        assert!(subs[0].text.ends_with('?'));
        assert_eq!(subs[0].kind, SubQueryKind::ChainPart);
        assert_eq!(subs[1].priority, 2);
    }

    #[test]
    fn test_short_question_fragments_discarded() {
        // "Why?" is under the usable length; degrade to a single original.
        let subs = decompose("Why? How does caching work?");
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].kind, SubQueryKind::Original);
    }

    #[test]
    fn test_multi_part_connector_split() {
        let subs = decompose("explain the retry policy and also describe the backoff curve");
        assert_eq!(subs.len(), 2);
        assert!(subs[0].text.contains("retry policy"));
        assert!(subs[1].text.contains("backoff curve"));
    }

    #[test]
    fn test_bare_conjunction_split() {
        let subs = decompose("deployment steps and rollback procedure");
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].text, "deployment steps");
        assert_eq!(subs[1].text, "rollback procedure");
    }

    #[test]
    fn test_comparison_beats_question_chain() {
        let subs = decompose("Docker vs Kubernetes? Which should we pick?");
        assert_eq!(subs[0].kind, SubQueryKind::ComparisonPart);
    }

    #[test]
    fn test_simple_query_degrades_to_original() {
        let subs = decompose("how does chunking work");
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].text, "how does chunking work");
        assert_eq!(subs[0].kind, SubQueryKind::Original);
    }

    #[test]
    fn test_should_decompose_gate_rejects_short_queries() {
        assert!(!should_decompose("Docker vs Kubernetes"));
        assert!(!should_decompose("a and b"));
    }

    #[test]
    fn test_should_decompose_accepts_long_signal_queries() {
        assert!(should_decompose(
            "what is the difference between managed identity and service principals"
        ));
        assert!(!should_decompose(
            "please summarize the architecture document thoroughly for me"
        ));
    }
}
