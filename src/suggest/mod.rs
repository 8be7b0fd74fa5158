//! Content suggestion engine.
//!
//! Turns a user's stored embeddings into a ranked list of content they have
//! not seen yet.
//!
//! # Architecture
//!
//! - `embedding`: Normalizes the encodings embeddings arrive in
//! - `centroid`: Averages embeddings into a single interest vector
//! - `retriever`: Nearest-neighbor query against the content index
//! - `fallback`: Recency-ranked content when personalization is impossible
//! - `dedup`: Lexical filter against newsletters the user already read
//! - `service`: Orchestrates the above behind `get_suggestions`

pub mod centroid;
pub mod dedup;
pub mod embedding;
pub mod fallback;
pub mod retriever;
mod service;

pub use centroid::{
    calculate_centroid, dominant_dimension, Centroid, CentroidOptions, CentroidSource,
};
pub use dedup::{jaccard_similarity, normalize_title, TitleFilter};
pub use embedding::{normalize, normalize_all, RawEmbedding};
pub use fallback::recent_suggestions;
pub use retriever::{RetrievalError, Retriever};
pub use service::{SuggestionError, SuggestionService, SuggestionSource, Suggestions};

/// Centroid dimension used when no embedding was observed
pub const DEFAULT_DIMENSION: usize = 1536;

/// Minimum vector similarity for personalized candidates
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Title Jaccard similarity above which a candidate counts as already read
pub const DEFAULT_TITLE_SIMILARITY_THRESHOLD: f32 = 0.5;

/// Title tokens must be longer than this many characters to count
pub const DEFAULT_MIN_TOKEN_LENGTH: usize = 3;
