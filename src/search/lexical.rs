//! Term-frequency scoring for the content scan half of hybrid search.
//!
//! For each whitespace-separated query term, the score contribution is
//! `occurrences(term) / content_chars * 100`; a flat 0.5 bonus is added
//! when the full query appears verbatim (case-insensitive). The character
//! normalization penalizes long documents and the resulting scores share
//! no scale with cosine similarity; both properties are preserved
//! deliberately for ranking compatibility with the existing corpus
//! (fusion handles the scale gap by taking the max, see `service.rs`).

/// Score extracted content against a query. Returns 0.0 for empty inputs.
pub fn score_content(query: &str, content: &str) -> f32 {
    if query.trim().is_empty() || content.is_empty() {
        return 0.0;
    }

    let content_lower = content.to_lowercase();
    let query_lower = query.to_lowercase();
    let content_chars = content_lower.chars().count();
    if content_chars == 0 {
        return 0.0;
    }

    let mut score = 0.0_f32;
    for term in query_lower.split_whitespace() {
        score += count_occurrences(&content_lower, term) as f32 / content_chars as f32 * 100.0;
    }

    if content_lower.contains(&query_lower) {
        score += 0.5;
    }

    score
}

/// Non-overlapping occurrence count of `needle` in `haystack`.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}
