//! Suggestion service.
//!
//! Wires the normalizer, aggregator, retriever, fallback and title filter
//! together. Collaborators are injected, the service itself keeps no state
//! between requests and can be shared across threads.
//!
//! Every failure after argument validation degrades to a smaller answer
//! instead of an error:
//! - user data unavailable: empty list
//! - no usable embedding, retrieval error or empty retrieval: recent content
//! - recent content unavailable: empty list

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    backend::{BackendError, ContentIndex, UserLibrary},
    config::{ConfigError, SuggestionConfig},
    content::{ContentCandidate, ExclusionSet, UserId, UserIdError},
};

use super::{
    calculate_centroid, normalize_all, recent_suggestions, Centroid, RawEmbedding, Retriever,
    TitleFilter,
};

#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] UserIdError),

    #[error("limit must be greater than zero")]
    InvalidLimit,

    #[error("upstream error: {0}")]
    Upstream(#[from] BackendError),
}

/// Which path produced a set of suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    /// Nearest neighbors of the user's interest centroid
    Personalized,
    /// Most recent processed content
    Recent,
    /// Nothing could be fetched
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestions {
    pub items: Vec<ContentCandidate>,
    pub source: SuggestionSource,
}

impl Suggestions {
    fn empty() -> Self {
        Self {
            items: vec![],
            source: SuggestionSource::None,
        }
    }
}

/// Everything fetched about a user for one request.
struct UserContext {
    embeddings: Vec<RawEmbedding>,
    exclusions: ExclusionSet,
}

pub struct SuggestionService {
    library: Arc<dyn UserLibrary>,
    index: Arc<dyn ContentIndex>,
    config: SuggestionConfig,
    retriever: Retriever,
    title_filter: TitleFilter,
}

impl SuggestionService {
    /// # Errors
    /// `ConfigError::Invalid` when `config` fails [`SuggestionConfig::validate`].
    pub fn new(
        library: Arc<dyn UserLibrary>,
        index: Arc<dyn ContentIndex>,
        config: SuggestionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let retriever = Retriever::new(config.similarity_threshold);
        let title_filter = TitleFilter::new(config.title_similarity_threshold, config.min_token_length);

        Ok(Self {
            library,
            index,
            config,
            retriever,
            title_filter,
        })
    }

    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    /// Ranked, deduplicated suggestions for `user_id`, at most `limit` long.
    ///
    /// Only caller mistakes are errors; see [`SuggestionService::suggest`].
    pub fn get_suggestions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ContentCandidate>, SuggestionError> {
        Ok(self.suggest(user_id, limit)?.items)
    }

    /// Like `get_suggestions`, also reporting which path produced the items.
    ///
    /// # Errors
    /// `InvalidUserId` or `InvalidLimit` when the arguments are unusable.
    /// Never returns `Upstream`.
    pub fn suggest(&self, user_id: &str, limit: usize) -> Result<Suggestions, SuggestionError> {
        let user = UserId::parse(user_id)?;
        let limit = self.effective_limit(limit)?;

        let context = match self.load_user_context(&user) {
            Ok(context) => context,
            Err(e) => {
                log::warn!("user={user} could not load user data: {e}");
                return Ok(Suggestions::empty());
            }
        };

        let centroid = self.centroid_from(&context.embeddings);
        let exclusions = &context.exclusions;

        let personalized = if centroid.is_default() {
            log::info!("user={user} has no usable embeddings, using recent content");
            None
        } else {
            match self
                .retriever
                .retrieve(self.index.as_ref(), &centroid, limit, exclusions)
            {
                Ok(candidates) if !candidates.is_empty() => Some(candidates),
                Ok(_) => {
                    log::info!("user={user} vector index returned nothing, using recent content");
                    None
                }
                Err(e) => {
                    log::warn!("user={user} retrieval failed, using recent content: {e}");
                    None
                }
            }
        };

        let (candidates, source) = match personalized {
            Some(candidates) => (candidates, SuggestionSource::Personalized),
            None => {
                let count = limit.saturating_add(exclusions.url_count());
                match recent_suggestions(self.index.as_ref(), count, exclusions) {
                    Ok(candidates) => (candidates, SuggestionSource::Recent),
                    Err(e) => {
                        log::warn!("user={user} recent content unavailable: {e}");
                        return Ok(Suggestions::empty());
                    }
                }
            }
        };

        let items = self.title_filter.apply(candidates, exclusions.titles(), limit);
        log::debug!("user={user} source={source:?} suggestions={}", items.len());

        Ok(Suggestions { items, source })
    }

    /// The interest centroid the service would query with for `user_id`.
    ///
    /// Unlike `suggest`, fetch failures are returned as `Upstream`.
    pub fn centroid_for(&self, user_id: &str) -> Result<Centroid, SuggestionError> {
        let user = UserId::parse(user_id)?;
        let embeddings = self.load_embeddings(&user)?;

        Ok(self.centroid_from(&embeddings))
    }

    fn effective_limit(&self, limit: usize) -> Result<usize, SuggestionError> {
        if limit == 0 {
            return Err(SuggestionError::InvalidLimit);
        }

        if limit > self.config.max_limit {
            log::debug!("limit {limit} clamped to {}", self.config.max_limit);
            return Ok(self.config.max_limit);
        }

        Ok(limit)
    }

    fn centroid_from(&self, embeddings: &[RawEmbedding]) -> Centroid {
        let vectors = normalize_all(embeddings);
        if vectors.len() < embeddings.len() {
            log::debug!(
                "dropped {} malformed embeddings",
                embeddings.len() - vectors.len()
            );
        }

        calculate_centroid(&vectors, &self.config.centroid_options())
    }

    /// Bookmark and newsletter embeddings, fetched concurrently.
    fn load_embeddings(&self, user: &UserId) -> Result<Vec<RawEmbedding>, BackendError> {
        let library = self.library.as_ref();
        let limit = self.config.embedding_fetch_limit;

        let (bookmarks, newsletters) = rayon::join(
            || library.bookmark_embeddings(user, limit),
            || library.newsletter_embeddings(user, limit),
        );

        let mut embeddings = bookmarks?;
        embeddings.extend(newsletters?);
        Ok(embeddings)
    }

    fn load_user_context(&self, user: &UserId) -> Result<UserContext, BackendError> {
        let library = self.library.as_ref();

        let (embeddings, (urls, subjects)) = rayon::join(
            || self.load_embeddings(user),
            || {
                rayon::join(
                    || library.bookmarked_urls(user),
                    || library.newsletter_subjects(user),
                )
            },
        );

        Ok(UserContext {
            embeddings: embeddings?,
            exclusions: ExclusionSet::new(urls?, subjects?),
        })
    }
}
