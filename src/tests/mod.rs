mod snapshot;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use chrono::{TimeZone, Utc};

use crate::{
    backend::{BackendError, ContentIndex, NearestQuery, UserLibrary},
    config::SuggestionConfig,
    suggest::{RawEmbedding, SuggestionService},
    ContentCandidate, UserId,
};

/// User library returning fixed data, or failing every call.
#[derive(Default)]
pub struct FakeLibrary {
    pub bookmark_embeddings: Vec<RawEmbedding>,
    pub newsletter_embeddings: Vec<RawEmbedding>,
    pub urls: Vec<String>,
    pub subjects: Vec<String>,
    pub fail: bool,
}

impl FakeLibrary {
    fn check(&self) -> Result<(), BackendError> {
        if self.fail {
            return Err(BackendError::Other("library offline".to_string()));
        }
        Ok(())
    }
}

impl UserLibrary for FakeLibrary {
    fn bookmark_embeddings(
        &self,
        _user: &UserId,
        limit: usize,
    ) -> Result<Vec<RawEmbedding>, BackendError> {
        self.check()?;
        Ok(self.bookmark_embeddings.iter().take(limit).cloned().collect())
    }

    fn newsletter_embeddings(
        &self,
        _user: &UserId,
        limit: usize,
    ) -> Result<Vec<RawEmbedding>, BackendError> {
        self.check()?;
        Ok(self.newsletter_embeddings.iter().take(limit).cloned().collect())
    }

    fn bookmarked_urls(&self, _user: &UserId) -> Result<Vec<String>, BackendError> {
        self.check()?;
        Ok(self.urls.clone())
    }

    fn newsletter_subjects(&self, _user: &UserId) -> Result<Vec<String>, BackendError> {
        self.check()?;
        Ok(self.subjects.clone())
    }
}

/// Content index with canned answers that counts its calls.
#[derive(Default)]
pub struct FakeIndex {
    pub nearest: Vec<ContentCandidate>,
    pub recent: Vec<ContentCandidate>,
    pub fail_nearest: bool,
    pub fail_recent: bool,
    pub nearest_calls: AtomicUsize,
    pub recent_calls: AtomicUsize,
    pub last_nearest_count: Mutex<Option<usize>>,
}

impl FakeIndex {
    pub fn nearest_calls(&self) -> usize {
        self.nearest_calls.load(Ordering::SeqCst)
    }

    pub fn recent_calls(&self) -> usize {
        self.recent_calls.load(Ordering::SeqCst)
    }
}

impl ContentIndex for FakeIndex {
    fn query_nearest(&self, query: &NearestQuery<'_>) -> Result<Vec<ContentCandidate>, BackendError> {
        self.nearest_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_nearest_count.lock().unwrap() = Some(query.count);

        if self.fail_nearest {
            return Err(BackendError::Other("rpc timed out".to_string()));
        }
        Ok(self.nearest.clone())
    }

    fn recent_processed(
        &self,
        count: usize,
        _exclude_urls: &[String],
    ) -> Result<Vec<ContentCandidate>, BackendError> {
        self.recent_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_recent {
            return Err(BackendError::Other("table unavailable".to_string()));
        }
        Ok(self.recent.iter().take(count).cloned().collect())
    }
}

pub fn service_with(
    library: FakeLibrary,
    index: Arc<FakeIndex>,
) -> SuggestionService {
    SuggestionService::new(Arc::new(library), index, SuggestionConfig::default()).unwrap()
}

pub fn candidate(id: &str, title: &str, similarity: Option<f32>) -> ContentCandidate {
    ContentCandidate {
        id: id.to_string(),
        url: format!("https://content.example/{id}"),
        title: title.to_string(),
        similarity,
        ..Default::default()
    }
}

/// Processed candidate created on the given day of May 2024.
pub fn recent(id: &str, title: &str, day: u32) -> ContentCandidate {
    ContentCandidate {
        created_at: Utc.with_ymd_and_hms(2024, 5, day, 8, 0, 0).unwrap(),
        ..candidate(id, title, None)
    }
}

pub fn embedding(values: &[f32]) -> RawEmbedding {
    RawEmbedding::Vector(values.to_vec())
}
