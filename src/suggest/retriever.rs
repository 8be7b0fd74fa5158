//! Nearest-neighbor retrieval against the content index.

use std::cmp::Ordering;

use crate::{
    backend::{BackendError, ContentIndex, NearestQuery},
    content::{ContentCandidate, ExclusionSet},
};

use super::{Centroid, DEFAULT_SIMILARITY_THRESHOLD};

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("centroid has no components")]
    EmptyCentroid,

    #[error("vector index query failed: {0}")]
    Query(#[from] BackendError),
}

/// Queries the content index with an interest centroid.
#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    threshold: f32,
}

impl Default for Retriever {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl Retriever {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Fetch up to `limit + excluded url count` candidates, most similar first.
    ///
    /// The extra rows absorb later filtering losses. Excluded URLs are removed
    /// here again even though the index was asked to skip them.
    pub fn retrieve(
        &self,
        index: &dyn ContentIndex,
        centroid: &Centroid,
        limit: usize,
        exclusions: &ExclusionSet,
    ) -> Result<Vec<ContentCandidate>, RetrievalError> {
        if centroid.dimension() == 0 {
            return Err(RetrievalError::EmptyCentroid);
        }

        let exclude_urls = exclusions.url_list();
        let count = limit.saturating_add(exclude_urls.len());

        let rows = index.query_nearest(&NearestQuery {
            embedding: centroid.values(),
            threshold: self.threshold,
            count,
            exclude_urls: &exclude_urls,
        })?;

        let returned = rows.len();
        let mut candidates: Vec<ContentCandidate> = rows
            .into_iter()
            .filter(|candidate| !exclusions.contains_url(&candidate.url))
            .collect();

        if candidates.len() < returned {
            log::warn!(
                "vector index returned {} excluded urls",
                returned - candidates.len()
            );
        }

        // stable: equal scores keep the index's order
        candidates.sort_by(by_similarity_desc);
        candidates.truncate(count);

        Ok(candidates)
    }
}

/// Highest similarity first, unscored rows last.
fn by_similarity_desc(a: &ContentCandidate, b: &ContentCandidate) -> Ordering {
    match (a.similarity, b.similarity) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
