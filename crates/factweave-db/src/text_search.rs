//! Query-string preparation for metadata-store text search.

/// Sanitize a free-text query for `websearch_to_tsquery`.
///
/// Strips characters the websearch parser treats as operators so arbitrary
/// user input cannot produce a malformed tsquery.
pub fn websearch_query(query: &str) -> String {
    query
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
