use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::suggest::{
    CentroidOptions, DEFAULT_DIMENSION, DEFAULT_MIN_TOKEN_LENGTH, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_TITLE_SIMILARITY_THRESHOLD,
};

const CONFIG_FILE: &str = "config.yaml";

/// How many embeddings per source are read for one centroid
const DEFAULT_EMBEDDING_FETCH_LIMIT: usize = 50;
const DEFAULT_LIMIT: usize = 10;
const DEFAULT_MAX_LIMIT: usize = 50;
const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("config is malformed: {0}")]
    Malformed(#[from] serde_yml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tuning knobs for the suggestion engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// Minimum vector similarity for personalized candidates [0.0, 1.0]
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Title Jaccard similarity above which a candidate is dropped [0.0, 1.0]
    #[serde(default = "default_title_similarity_threshold")]
    pub title_similarity_threshold: f32,

    /// Title tokens must be longer than this to be compared
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,

    /// Dimension of the placeholder centroid when no embedding is usable
    #[serde(default = "default_fallback_dimension")]
    pub fallback_dimension: usize,

    /// Embeddings fetched per source (bookmarks, newsletters)
    #[serde(default = "default_embedding_fetch_limit")]
    pub embedding_fetch_limit: usize,

    /// Limit used when a request does not specify one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Larger requested limits are clamped to this
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Fill the placeholder centroid with random noise instead of a constant
    #[serde(default = "default_randomize_default_centroid")]
    pub randomize_default_centroid: bool,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            title_similarity_threshold: DEFAULT_TITLE_SIMILARITY_THRESHOLD,
            min_token_length: DEFAULT_MIN_TOKEN_LENGTH,
            fallback_dimension: DEFAULT_DIMENSION,
            embedding_fetch_limit: DEFAULT_EMBEDDING_FETCH_LIMIT,
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            randomize_default_centroid: true,
        }
    }
}

impl SuggestionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "suggestions.similarity_threshold must be between 0.0 and 1.0, got {}",
                self.similarity_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.title_similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "suggestions.title_similarity_threshold must be between 0.0 and 1.0, got {}",
                self.title_similarity_threshold
            )));
        }

        if self.fallback_dimension == 0 {
            return Err(ConfigError::Invalid(
                "suggestions.fallback_dimension must be greater than 0".to_string(),
            ));
        }

        if self.embedding_fetch_limit == 0 {
            return Err(ConfigError::Invalid(
                "suggestions.embedding_fetch_limit must be greater than 0".to_string(),
            ));
        }

        if self.max_limit == 0 {
            return Err(ConfigError::Invalid(
                "suggestions.max_limit must be greater than 0".to_string(),
            ));
        }

        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigError::Invalid(format!(
                "suggestions.default_limit must be between 1 and max_limit ({}), got {}",
                self.max_limit, self.default_limit
            )));
        }

        Ok(())
    }

    pub fn centroid_options(&self) -> CentroidOptions {
        CentroidOptions {
            fallback_dimension: self.fallback_dimension,
            randomize_default: self.randomize_default_centroid,
        }
    }
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_title_similarity_threshold() -> f32 {
    DEFAULT_TITLE_SIMILARITY_THRESHOLD
}

fn default_min_token_length() -> usize {
    DEFAULT_MIN_TOKEN_LENGTH
}

fn default_fallback_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_embedding_fetch_limit() -> usize {
    DEFAULT_EMBEDDING_FETCH_LIMIT
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_max_limit() -> usize {
    DEFAULT_MAX_LIMIT
}

fn default_randomize_default_centroid() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub suggestions: SuggestionConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.suggestions.validate()?;

        if self.daemon.listen.trim().is_empty() {
            return Err(ConfigError::Invalid("daemon.listen is empty".to_string()));
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, creating it with defaults if missing.
    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        let path = base_path.join(CONFIG_FILE);

        if !path.exists() {
            log::info!("Creating default config at {}", path.display());
            std::fs::create_dir_all(base_path)?;
            write_atomic(&path, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str = std::fs::read_to_string(&path)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_path_buf();
        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let config_str = serde_yml::to_string(&self)?;
        write_atomic(&self.base_path.join(CONFIG_FILE), config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("yaml.tmp");
    std::fs::write(&temp_path, data)?;
    std::fs::rename(&temp_path, path)
}
