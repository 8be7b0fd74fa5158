//! Snapshot backed implementation of both backend ports.
//!
//! The whole data set lives in memory, content embeddings are held in a
//! [`VectorIndex`]. Useful for local runs, demos and tests.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    content::{ContentCandidate, ContentStatus, UserId},
    suggest::{dominant_dimension, normalize, RawEmbedding},
};

use super::{BackendError, ContentIndex, NearestQuery, UserLibrary, VectorIndex};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<UserSnapshot>,
    #[serde(default)]
    pub content: Vec<ContentRecord>,
}

/// A user's library, lists ordered most recent first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: String,
    #[serde(default)]
    pub bookmarks: Vec<BookmarkRecord>,
    #[serde(default)]
    pub newsletters: Vec<NewsletterRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<RawEmbedding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsletterRecord {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<RawEmbedding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(flatten)]
    pub candidate: ContentCandidate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<RawEmbedding>,
}

pub struct MemoryBackend {
    users: HashMap<String, UserSnapshot>,
    content: Vec<ContentCandidate>,
    /// Content id -> position in `content`
    positions: HashMap<String, usize>,
    index: VectorIndex,
}

impl MemoryBackend {
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        let backend = Self::from_snapshot(snapshot);

        log::info!(
            "loaded snapshot {} with {} users, {} content rows, {} indexed ({} dimensions)",
            path.display(),
            backend.users.len(),
            backend.content_count(),
            backend.indexed_count(),
            backend.index.dimensions()
        );

        Ok(backend)
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let users = snapshot
            .users
            .into_iter()
            .map(|user| (user.id.trim().to_string(), user))
            .collect();

        let mut content = Vec::with_capacity(snapshot.content.len());
        let mut positions = HashMap::new();
        let mut vectors = Vec::new();

        for record in snapshot.content {
            let id = record.candidate.id.clone();
            if positions.contains_key(&id) {
                log::warn!("duplicate content id {id:?} in snapshot, skipping");
                continue;
            }

            match record.embedding.as_ref().map(normalize) {
                Some(Some(vector)) => vectors.push((id.clone(), vector)),
                Some(None) => log::warn!("content {id:?} has an unusable embedding"),
                None => {}
            }

            positions.insert(id, content.len());
            content.push(record.candidate);
        }

        let dimensions =
            dominant_dimension(vectors.iter().map(|(_, v)| v.len())).unwrap_or_default();
        let mut index = VectorIndex::new(dimensions);
        for (id, vector) in vectors {
            if let Err(e) = index.insert(id.clone(), vector) {
                log::warn!("content {id:?} left out of the vector index: {e}");
            }
        }

        Self {
            users,
            content,
            positions,
            index,
        }
    }

    pub fn content_count(&self) -> usize {
        self.content.len()
    }

    pub fn indexed_count(&self) -> usize {
        self.index.len()
    }

    fn user(&self, user: &UserId) -> Option<&UserSnapshot> {
        self.users.get(user.as_str())
    }

    fn candidate(&self, id: &str) -> Option<&ContentCandidate> {
        self.positions.get(id).and_then(|&pos| self.content.get(pos))
    }
}

impl UserLibrary for MemoryBackend {
    fn bookmark_embeddings(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<RawEmbedding>, BackendError> {
        Ok(self
            .user(user)
            .map(|u| {
                u.bookmarks
                    .iter()
                    .filter_map(|b| b.embedding.clone())
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn newsletter_embeddings(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<RawEmbedding>, BackendError> {
        Ok(self
            .user(user)
            .map(|u| {
                u.newsletters
                    .iter()
                    .filter_map(|n| n.embedding.clone())
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn bookmarked_urls(&self, user: &UserId) -> Result<Vec<String>, BackendError> {
        Ok(self
            .user(user)
            .map(|u| u.bookmarks.iter().map(|b| b.url.clone()).collect())
            .unwrap_or_default())
    }

    fn newsletter_subjects(&self, user: &UserId) -> Result<Vec<String>, BackendError> {
        Ok(self
            .user(user)
            .map(|u| u.newsletters.iter().map(|n| n.subject.clone()).collect())
            .unwrap_or_default())
    }
}

impl ContentIndex for MemoryBackend {
    fn query_nearest(&self, query: &NearestQuery<'_>) -> Result<Vec<ContentCandidate>, BackendError> {
        let excluded: HashSet<&str> = query.exclude_urls.iter().map(String::as_str).collect();

        let skip = |id: &str| {
            self.candidate(id).map_or(true, |c| {
                c.status != ContentStatus::Processed || excluded.contains(c.url.as_str())
            })
        };

        let results = self
            .index
            .search(query.embedding, query.threshold, query.count, skip)?;

        Ok(results
            .into_iter()
            .filter_map(|result| {
                self.candidate(&result.id).map(|c| ContentCandidate {
                    similarity: Some(result.score),
                    ..c.clone()
                })
            })
            .collect())
    }

    fn recent_processed(
        &self,
        count: usize,
        exclude_urls: &[String],
    ) -> Result<Vec<ContentCandidate>, BackendError> {
        let excluded: HashSet<&str> = exclude_urls.iter().map(String::as_str).collect();

        let mut rows: Vec<ContentCandidate> = self
            .content
            .iter()
            .filter(|c| c.status == ContentStatus::Processed && !excluded.contains(c.url.as_str()))
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(count);

        Ok(rows)
    }
}
