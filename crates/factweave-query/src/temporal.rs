//! Temporal intent detection.
//!
//! Derives recency/history signals and date bounds from query phrasing.
//! `is_historical` and `requires_latest` are not mutually exclusive; when
//! both fire, `requires_latest` wins for `date_from` and the historical
//! flag is carried as intent only.

use chrono::{Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use factweave_core::{defaults, TemporalIntent};

static LATEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:latest|most recent|recent|current(?:ly)?|right now|as of (?:today|now)|this week)\b")
        .unwrap()
});

static HISTORICAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:history|historical|in the past|archived?|used to|originally|years ago|back then)\b")
        .unwrap()
});

static LAST_N_DAYS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:last|past)\s+(\d{1,4})\s+days?\b").unwrap());

static RELATIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:last|past)\s+(week|month|year)\b|\byesterday\b").unwrap());

static EXPLICIT_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

static SOURCE_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bin (?:the |my )?(docs|documentation|code|notes|reports|emails)\b").unwrap()
});

/// Detect temporal intent in a query, relative to today's date.
pub fn detect_temporal_intent(query: &str) -> TemporalIntent {
    detect_with_today(query, Utc::now().date_naive())
}

/// Deterministic variant used by tests.
pub fn detect_with_today(query: &str, today: NaiveDate) -> TemporalIntent {
    let mut intent = TemporalIntent::default();
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return intent;
    }

    intent.is_historical = HISTORICAL_RE.is_match(trimmed);
    intent.requires_latest = LATEST_RE.is_match(trimmed);

    // Specific ranges first: explicit dates, then counted/named relatives.
    if let Some(caps) = EXPLICIT_DATE_RE.captures(trimmed) {
        let parsed = NaiveDate::from_ymd_opt(
            caps[1].parse().unwrap_or(0),
            caps[2].parse().unwrap_or(0),
            caps[3].parse().unwrap_or(0),
        );
        // Future dates cannot bound past facts; ignore them.
        if let Some(date) = parsed.filter(|d| *d <= today) {
            intent.date_from = Some(date);
        }
    }

    if intent.date_from.is_none() {
        if let Some(caps) = LAST_N_DAYS_RE.captures(trimmed) {
            if let Ok(days) = caps[1].parse::<i64>() {
                intent.date_from = Some(today - Duration::days(days));
            }
        }
    }

    if intent.date_from.is_none() {
        if let Some(caps) = RELATIVE_RE.captures(trimmed) {
            let days = match caps.get(1).map(|m| m.as_str().to_lowercase()) {
                Some(unit) if unit == "week" => 7,
                Some(unit) if unit == "month" => 30,
                Some(unit) if unit == "year" => 365,
                // Bare "yesterday" match.
                _ => 1,
            };
            let date = today - Duration::days(days);
            intent.date_from = Some(date);
            if days == 1 {
                intent.date_to = Some(date);
            }
        }
    }

    // Recency intent wins the date_from slot when nothing more specific
    // already claimed it.
    if intent.requires_latest && intent.date_from.is_none() {
        intent.date_from = Some(today - Duration::days(defaults::LATEST_WINDOW_DAYS));
    }

    intent.source_hint = SOURCE_HINT_RE
        .captures(trimmed)
        .map(|caps| caps[1].to_lowercase());

    intent
}
