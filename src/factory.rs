use crate::{
    backend::{ContentIndex, MemoryBackend, RestBackend, UserLibrary},
    config::Config,
    suggest::SuggestionService,
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SNAPSHOT_FILE: &str = "snapshot.json";

/// Builds the suggestion service and its collaborators from the environment
pub struct AppFactory;

impl AppFactory {
    /// Create a suggestion service with the appropriate backend
    ///
    /// An explicit `data` snapshot always wins. Otherwise `CURIO_REST_URL`
    /// selects the PostgREST backend, and the default snapshot under the base
    /// path is used when it is unset.
    pub fn create_service(
        paths: &AppPaths,
        data: Option<PathBuf>,
        config: &Config,
    ) -> Result<SuggestionService> {
        let (library, index) = match data {
            Some(path) => Self::create_memory_backend(&path, true)?,
            None => match Self::rest_url() {
                Some(addr) => Self::create_rest_backend(&addr)?,
                None => Self::create_memory_backend(&paths.snapshot_path, false)?,
            },
        };

        SuggestionService::new(library, index, config.suggestions.clone())
            .context("Invalid suggestions config")
    }

    fn create_memory_backend(
        path: &Path,
        required: bool,
    ) -> Result<(Arc<dyn UserLibrary>, Arc<dyn ContentIndex>)> {
        let backend = if !required && !path.exists() {
            log::warn!(
                "No snapshot at {}, starting with an empty data set",
                path.display()
            );
            MemoryBackend::from_snapshot(Default::default())
        } else {
            MemoryBackend::load(path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?
        };

        let backend = Arc::new(backend);
        let library: Arc<dyn UserLibrary> = backend.clone();
        let index: Arc<dyn ContentIndex> = backend;
        Ok((library, index))
    }

    fn create_rest_backend(addr: &str) -> Result<(Arc<dyn UserLibrary>, Arc<dyn ContentIndex>)> {
        log::info!("Using remote backend: {}", addr);
        let backend = RestBackend::new(addr, Self::rest_key())
            .with_context(|| format!("Invalid CURIO_REST_URL {addr:?}"))?;

        let backend = Arc::new(backend);
        let library: Arc<dyn UserLibrary> = backend.clone();
        let index: Arc<dyn ContentIndex> = backend;
        Ok((library, index))
    }

    /// Get application paths, creating the base directory
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;
        let snapshot_path = base_path.join(SNAPSHOT_FILE);

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths {
            base_path,
            snapshot_path,
        })
    }

    pub fn create_config(base_path: &Path) -> Result<Config> {
        Config::load_with(base_path)
            .with_context(|| format!("Failed to load config from {}", base_path.display()))
    }

    fn get_base_path() -> Result<PathBuf> {
        if let Ok(base_path) = std::env::var("CURIO_BASE_PATH") {
            return Ok(PathBuf::from(base_path));
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;

        Ok(home.join(".local/share/curio"))
    }

    fn rest_url() -> Option<String> {
        non_empty_env("CURIO_REST_URL")
    }

    fn rest_key() -> Option<String> {
        non_empty_env("CURIO_REST_KEY")
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Application paths structure
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: PathBuf,
    pub snapshot_path: PathBuf,
}
