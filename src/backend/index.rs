//! In-memory vector index with cosine similarity search.
//!
//! Holds content embeddings keyed by content id for the snapshot backend.

use std::{cmp::Ordering, collections::HashMap};

/// In-memory vector index for nearest-neighbor lookups.
///
/// Every stored vector has the same dimension and a non-zero norm, so the
/// similarity of a stored vector is always defined.
#[derive(Debug, Default)]
pub struct VectorIndex {
    /// Content id -> (embedding, l2 norm)
    entries: HashMap<String, (Vec<f32>, f32)>,
    dimensions: usize,
}

/// Search result from the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    /// Cosine similarity score (-1.0 to 1.0)
    pub score: f32,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: HashMap::new(),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the embedding for `id`.
    pub fn insert(&mut self, id: impl Into<String>, embedding: Vec<f32>) -> Result<(), IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }

        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::NonFinite);
        }

        let norm = l2_norm(&embedding);
        if norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        self.entries.insert(id.into(), (embedding, norm));
        Ok(())
    }

    /// Search for similar vectors using cosine similarity.
    ///
    /// # Arguments
    /// * `query` - The query embedding vector
    /// * `threshold` - Minimum similarity score
    /// * `limit` - Maximum number of results to return
    /// * `skip` - Ids for which this returns true are never returned
    ///
    /// # Returns
    /// Results sorted by score (highest first), equal scores by id.
    pub fn search(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
        skip: impl Fn(&str) -> bool,
    ) -> Result<Vec<SearchResult>, IndexError> {
        if self.is_empty() {
            return Ok(vec![]);
        }

        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        if query_norm < f32::EPSILON || !query_norm.is_finite() {
            return Err(IndexError::ZeroNormVector);
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .filter(|(id, _)| !skip(id))
            .filter_map(|(id, (embedding, norm))| {
                let dot: f32 = query.iter().zip(embedding).map(|(a, b)| a * b).sum();
                let score = dot / (query_norm * norm);
                (score >= threshold).then(|| SearchResult {
                    id: id.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(limit);

        Ok(results)
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot store or search with zero-norm vector")]
    ZeroNormVector,

    #[error("Vector contains NaN or infinite components")]
    NonFinite,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_skip(_: &str) -> bool {
        false
    }

    #[test]
    fn test_new_index() {
        let index = VectorIndex::new(384);
        assert_eq!(index.dimensions(), 384);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_dimension_mismatch() {
        let mut index = VectorIndex::new(3);
        let result = index.insert("a", vec![1.0, 0.0, 0.0, 0.0]);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_insert_zero_norm_rejected() {
        let mut index = VectorIndex::new(3);
        let result = index.insert("a", vec![0.0, 0.0, 0.0]);
        assert!(matches!(result, Err(IndexError::ZeroNormVector)));
    }

    #[test]
    fn test_insert_nan_rejected() {
        let mut index = VectorIndex::new(3);
        let result = index.insert("a", vec![1.0, f32::NAN, 0.0]);
        assert!(matches!(result, Err(IndexError::NonFinite)));
    }

    #[test]
    fn test_insert_replaces_existing_id() {
        let mut index = VectorIndex::new(3);
        index.insert("a", vec![1.0, 0.0, 0.0]).unwrap();
        index.insert("a", vec![0.0, 1.0, 0.0]).unwrap();
        assert_eq!(index.len(), 1);

        let results = index.search(&[0.0, 1.0, 0.0], 0.9, 10, no_skip).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_search_basic() {
        let mut index = VectorIndex::new(3);
        index.insert("a", vec![1.0, 0.0, 0.0]).unwrap();
        index.insert("b", vec![0.0, 1.0, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.1, 0.0], 0.0, 10, no_skip).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_search_with_threshold() {
        let mut index = VectorIndex::new(3);
        index.insert("a", vec![1.0, 0.0, 0.0]).unwrap();
        index.insert("b", vec![0.0, 1.0, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 0.9, 10, no_skip).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
        assert!((results[0].score - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_search_with_limit() {
        let mut index = VectorIndex::new(3);
        for i in 0..10 {
            index
                .insert(i.to_string(), vec![1.0, i as f32 * 0.1, 0.0])
                .unwrap();
        }

        let results = index.search(&[1.0, 0.0, 0.0], 0.0, 3, no_skip).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "0");
    }

    #[test]
    fn test_search_skips_ids() {
        let mut index = VectorIndex::new(3);
        index.insert("a", vec![1.0, 0.0, 0.0]).unwrap();
        index.insert("b", vec![0.9, 0.1, 0.0]).unwrap();

        let results = index
            .search(&[1.0, 0.0, 0.0], 0.0, 10, |id| id == "a")
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "b");
    }

    #[test]
    fn test_equal_scores_ordered_by_id() {
        let mut index = VectorIndex::new(2);
        index.insert("z", vec![1.0, 0.0]).unwrap();
        index.insert("m", vec![2.0, 0.0]).unwrap();
        index.insert("a", vec![3.0, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0], 0.0, 10, no_skip).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = VectorIndex::new(3);
        let results = index.search(&[1.0; 8], 0.0, 10, no_skip).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let mut index = VectorIndex::new(3);
        index.insert("a", vec![1.0, 0.0, 0.0]).unwrap();

        let result = index.search(&[1.0, 0.0], 0.0, 10, no_skip);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }
}
