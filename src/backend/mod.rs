//! Data access for the suggestion engine.
//!
//! The engine only talks to two ports: [`UserLibrary`] for what a user saved
//! and read, and [`ContentIndex`] for the pool of candidate content. Two
//! adapters ship with the crate, an in-memory snapshot and a PostgREST client.

pub mod index;
pub mod memory;
pub mod remote;

pub use index::{IndexError, VectorIndex};
pub use memory::MemoryBackend;
pub use remote::RestBackend;

use crate::{
    content::{ContentCandidate, UserId},
    suggest::RawEmbedding,
};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

/// Parameters of a nearest-neighbor lookup.
#[derive(Debug, Clone, Copy)]
pub struct NearestQuery<'a> {
    pub embedding: &'a [f32],
    /// Minimum cosine similarity
    pub threshold: f32,
    /// Maximum number of rows
    pub count: usize,
    pub exclude_urls: &'a [String],
}

/// A user's saved bookmarks and received newsletters.
pub trait UserLibrary: Send + Sync {
    /// Stored embeddings of the user's most recent bookmarks, raw as stored.
    fn bookmark_embeddings(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<RawEmbedding>, BackendError>;

    /// Stored embeddings of the user's most recent newsletters, raw as stored.
    fn newsletter_embeddings(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<RawEmbedding>, BackendError>;

    /// Every URL the user has bookmarked.
    fn bookmarked_urls(&self, user: &UserId) -> Result<Vec<String>, BackendError>;

    /// Subjects of every newsletter the user received.
    fn newsletter_subjects(&self, user: &UserId) -> Result<Vec<String>, BackendError>;
}

/// Searchable pool of content that can be suggested.
pub trait ContentIndex: Send + Sync {
    fn query_nearest(&self, query: &NearestQuery<'_>) -> Result<Vec<ContentCandidate>, BackendError>;

    /// Newest processed content not in `exclude_urls`, at most `count` rows.
    fn recent_processed(
        &self,
        count: usize,
        exclude_urls: &[String],
    ) -> Result<Vec<ContentCandidate>, BackendError>;
}
