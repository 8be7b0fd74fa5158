use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, hash::Hash};

use crate::suggest::normalize_title;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Pending,
    #[default]
    Processed,
    Failed,
}

/// A piece of content that can be suggested to a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentCandidate {
    pub id: String,
    pub url: String,

    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,

    /// Similarity to the query vector, only set by the vector index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default)]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub status: ContentStatus,
}

impl Hash for ContentCandidate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialEq for ContentCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContentCandidate {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdError {
    #[error("user id is empty")]
    Empty,

    #[error("user id is {0} characters long, at most {max} allowed", max = UserId::MAX_LEN)]
    TooLong(usize),

    #[error("user id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Opaque user identifier as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub const MAX_LEN: usize = 128;

    pub fn parse(raw: &str) -> Result<Self, UserIdError> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Err(UserIdError::Empty);
        }

        let len = raw.chars().count();
        if len > Self::MAX_LEN {
            return Err(UserIdError::TooLong(len));
        }

        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '|')))
        {
            return Err(UserIdError::InvalidChar(c));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a user has already seen: bookmarked URLs and read newsletter subjects.
///
/// Subjects are stored normalized (lowercased, trimmed); empty ones are dropped.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    urls: HashSet<String>,
    titles: HashSet<String>,
}

impl ExclusionSet {
    pub fn new<U, T>(urls: U, titles: T) -> Self
    where
        U: IntoIterator<Item = String>,
        T: IntoIterator<Item = String>,
    {
        Self {
            urls: urls.into_iter().filter(|url| !url.is_empty()).collect(),
            titles: titles
                .into_iter()
                .map(|title| normalize_title(&title))
                .filter(|title| !title.is_empty())
                .collect(),
        }
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn url_count(&self) -> usize {
        self.urls.len()
    }

    /// Excluded URLs in a stable order, for handing to collaborators.
    pub fn url_list(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.urls.iter().cloned().collect();
        urls.sort();
        urls
    }

    pub fn titles(&self) -> &HashSet<String> {
        &self.titles
    }
}
