//! Query classification for retrieval skipping.
//!
//! Tool-specific queries (arithmetic, date/time, web intent) are answered
//! without graph retrieval; everything else goes through search.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Arithmetic between two numbers. A bare `-` only counts when spaced, so
/// dates (`2024-01-15`) and numeric product names (`RTX 4090`) never match.
static ARITHMETIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:\.\d+)?\s*[+*/×÷^]\s*\d+(?:\.\d+)?|\d+(?:\.\d+)?\s+-\s+\d+(?:\.\d+)?")
        .unwrap()
});

/// Percentage/calculation phrasing.
static CALC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:calculate|compute)\b|\d+(?:\.\d+)?\s*(?:%|percent)\s+of\s+\d").unwrap()
});

/// Date/time questions answered from the clock, not the graph.
static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:what(?:'s| is) the (?:time|date)|what time is it|current time|today'?s date|what day is (?:it|today))\b",
    )
    .unwrap()
});

/// Explicit web-search intent.
static WEB_SEARCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:search the (?:web|internet)|google (?:for|it|this)|look up online|browse the web|latest news)\b")
        .unwrap()
});

/// Classification flags for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClassification {
    pub is_math: bool,
    pub is_date_time: bool,
    pub is_web_search: bool,
    /// True when the query is tool-specific and graph search adds nothing.
    pub should_skip_search: bool,
    pub reason: String,
}

/// Classify a query.
///
/// Null/empty/whitespace input returns all flags false with reason
/// "Invalid query" and does not skip search: "nothing to classify" is not
/// the same as "classified as skippable".
pub fn classify(query: &str) -> QueryClassification {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return QueryClassification {
            reason: "Invalid query".to_string(),
            ..Default::default()
        };
    }

    let is_math = ARITHMETIC_RE.is_match(trimmed) || CALC_RE.is_match(trimmed);
    let is_date_time = DATE_TIME_RE.is_match(trimmed);
    let is_web_search = WEB_SEARCH_RE.is_match(trimmed);

    let (should_skip_search, reason) = if is_math {
        (true, "Arithmetic query, answered without retrieval")
    } else if is_date_time {
        (true, "Date/time query, answered from the clock")
    } else if is_web_search {
        (true, "Web-search intent, handled by the web tool")
    } else {
        (false, "No tool-specific pattern matched")
    };

    QueryClassification {
        is_math,
        is_date_time,
        is_web_search,
        should_skip_search,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_expression_skips_search() {
        let c = classify("50 * 2");
        assert!(c.is_math);
        assert!(c.should_skip_search);
    }

    #[test]
    fn test_spaced_subtraction_is_math() {
        assert!(classify("100 - 42").is_math);
    }

    #[test]
    fn test_numeric_product_name_is_not_math() {
        let c = classify("What is RTX 4090 TDP?");
        assert!(!c.is_math);
        assert!(!c.should_skip_search);
    }

    #[test]
    fn test_iso_date_is_not_math() {
        assert!(!classify("what happened on 2024-01-15").is_math);
    }

    #[test]
    fn test_percentage_of_is_math() {
        let c = classify("what is 15% of 80");
        assert!(c.is_math);
        assert!(c.should_skip_search);
    }

    #[test]
    fn test_calculate_phrasing_is_math() {
        assert!(classify("calculate the monthly payment").is_math);
    }

    #[test]
    fn test_date_time_query_skips_search() {
        let c = classify("what time is it");
        assert!(c.is_date_time);
        assert!(c.should_skip_search);
        assert!(!c.is_math);
    }

    #[test]
    fn test_web_search_intent_skips_search() {
        let c = classify("search the web for rust jobs");
        assert!(c.is_web_search);
        assert!(c.should_skip_search);
    }

    #[test]
    fn test_empty_query_is_invalid_but_not_skipped() {
        for q in ["", "   ", "\n\t"] {
            let c = classify(q);
            assert!(!c.is_math);
            assert!(!c.is_date_time);
            assert!(!c.is_web_search);
            assert!(!c.should_skip_search);
            assert_eq!(c.reason, "Invalid query");
        }
    }

    #[test]
    fn test_ordinary_question_searches() {
        let c = classify("How does the billing pipeline handle refunds?");
        assert!(!c.should_skip_search);
    }
}
