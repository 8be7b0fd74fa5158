//! Lexical near-duplicate filter.
//!
//! Drops candidates whose title matches, or mostly overlaps with, the subject
//! of a newsletter the user already read. Cheap enough to run synchronously on
//! every request.

use std::collections::HashSet;
use std::hash::Hash;

use crate::content::ContentCandidate;

use super::{DEFAULT_MIN_TOKEN_LENGTH, DEFAULT_TITLE_SIMILARITY_THRESHOLD};

/// Lowercase and trim a title for comparison.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// |A ∩ B| / |A ∪ B|, or 0.0 when both sets are empty.
pub fn jaccard_similarity<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }

    a.intersection(b).count() as f32 / union as f32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleFilter {
    threshold: f32,
    min_token_length: usize,
}

impl Default for TitleFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_SIMILARITY_THRESHOLD, DEFAULT_MIN_TOKEN_LENGTH)
    }
}

impl TitleFilter {
    /// # Arguments
    /// * `threshold` - Jaccard similarity above which titles count as duplicates
    /// * `min_token_length` - Tokens must be longer than this (in characters)
    pub fn new(threshold: f32, min_token_length: usize) -> Self {
        Self {
            threshold,
            min_token_length,
        }
    }

    /// Significant words of an already normalized title.
    fn tokens<'a>(&self, normalized: &'a str) -> HashSet<&'a str> {
        normalized
            .split_whitespace()
            .filter(|token| token.chars().count() > self.min_token_length)
            .collect()
    }

    /// Check a single title against normalized reference titles.
    pub fn is_too_similar(&self, title: &str, references: &HashSet<String>) -> bool {
        let reference_tokens: Vec<HashSet<&str>> =
            references.iter().map(|r| self.tokens(r)).collect();

        self.matches(title, references, &reference_tokens)
    }

    fn matches(
        &self,
        title: &str,
        references: &HashSet<String>,
        reference_tokens: &[HashSet<&str>],
    ) -> bool {
        let normalized = normalize_title(title);
        if normalized.is_empty() {
            return false;
        }

        if references.contains(&normalized) {
            return true;
        }

        let tokens = self.tokens(&normalized);
        reference_tokens
            .iter()
            .any(|reference| jaccard_similarity(&tokens, reference) > self.threshold)
    }

    /// Remove near-duplicates of `references`, keep order, truncate to `limit`.
    ///
    /// `references` must already be normalized, see [`normalize_title`].
    pub fn apply(
        &self,
        candidates: Vec<ContentCandidate>,
        references: &HashSet<String>,
        limit: usize,
    ) -> Vec<ContentCandidate> {
        let reference_tokens: Vec<HashSet<&str>> =
            references.iter().map(|r| self.tokens(r)).collect();

        let total = candidates.len();
        let kept: Vec<ContentCandidate> = candidates
            .into_iter()
            .filter(|candidate| !self.matches(&candidate.title, references, &reference_tokens))
            .collect();

        if kept.len() < total {
            log::debug!("dropped {} near-duplicate titles", total - kept.len());
        }

        kept.into_iter().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn references(titles: &[&str]) -> HashSet<String> {
        titles.iter().map(|t| normalize_title(t)).collect()
    }

    fn candidate(id: &str, title: &str) -> ContentCandidate {
        ContentCandidate {
            id: id.to_string(),
            url: format!("https://example.com/{id}"),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_jaccard_basic() {
        let a: HashSet<&str> = ["large", "language", "models"].into_iter().collect();
        let b: HashSet<&str> = ["language", "models", "today"].into_iter().collect();
        assert!((jaccard_similarity(&a, &b) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_jaccard_empty_sets() {
        let empty: HashSet<&str> = HashSet::new();
        assert_eq!(jaccard_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let filter = TitleFilter::default();
        let refs = references(&["weekly ai digest"]);
        assert!(filter.is_too_similar("Weekly AI Digest", &refs));
        assert!(filter.is_too_similar("  weekly ai DIGEST  ", &refs));
    }

    #[test]
    fn test_high_overlap_is_similar() {
        let filter = TitleFilter::default();
        let refs = references(&["introduction to large language models today"]);

        // shared: large, language, models, today -> 4 / 6
        assert!(filter.is_too_similar("large language models explained today", &refs));
    }

    #[test]
    fn test_overlap_at_threshold_is_kept() {
        let filter = TitleFilter::default();
        let refs = references(&["rust async runtime"]);

        // shared: rust, async -> 2 / 4 (exactly 0.5)
        assert!(!filter.is_too_similar("rust async closures", &refs));
    }

    #[test]
    fn test_short_tokens_ignored() {
        let filter = TitleFilter::default();
        let refs = references(&["the new way to do it"]);

        // no tokens longer than 3 chars on either side
        assert!(!filter.is_too_similar("the old way to do it", &refs));
    }

    #[test]
    fn test_empty_title_never_filtered() {
        let filter = TitleFilter::default();
        let refs = references(&["", "weekly ai digest"]);
        assert!(!filter.is_too_similar("", &refs));
        assert!(!filter.is_too_similar("   ", &refs));
    }

    #[test]
    fn test_threshold_configurable() {
        let strict = TitleFilter::new(0.2, 3);
        let refs = references(&["rust async runtime"]);
        assert!(strict.is_too_similar("rust async closures", &refs));
    }

    #[test]
    fn test_apply_keeps_order_and_truncates() {
        let filter = TitleFilter::default();
        let refs = references(&["weekly ai digest"]);
        let candidates = vec![
            candidate("1", "Rust in production"),
            candidate("2", "Weekly AI Digest"),
            candidate("3", "Postgres indexing tricks"),
            candidate("4", "Vector search at scale"),
        ];

        let result = filter.apply(candidates, &refs, 2);
        let ids: Vec<&str> = result.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_apply_without_references() {
        let filter = TitleFilter::default();
        let candidates = vec![candidate("1", "a"), candidate("2", "b")];

        let result = filter.apply(candidates, &HashSet::new(), 10);
        assert_eq!(result.len(), 2);
    }
}
