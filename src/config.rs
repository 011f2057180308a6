//! Runtime configuration: cache TTLs and sizes, result limits, worker settings.
//!
//! Every key is optional; missing keys take the defaults below.
//!
//! ```toml
//! structure_ttl_secs = 300
//! document_cache_size = 50
//! search_max_results = 20
//! sweep_interval_secs = 120
//! ```

use crate::cache::{DEFAULT_MAX_SIZE, DEFAULT_TTL};
use crate::error::ConfigError;
use crate::related;
use crate::search::index;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::time::Duration;

/// Shortest allowed period for the background expiry sweep.
pub const MIN_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
    pub structure_ttl_secs: u64,
    pub document_ttl_secs: u64,
    pub related_ttl_secs: u64,
    pub structure_cache_size: usize,
    pub document_cache_size: usize,
    pub related_cache_size: usize,
    /// Maximum number of search hits returned
    pub search_max_results: usize,
    /// Default number of related documents returned
    pub related_limit: usize,
    /// Debounce the UI should apply before calling search. Not enforced here.
    pub search_debounce_ms: u64,
    /// Characters kept in an indexed preview
    pub preview_length: usize,
    /// Documents fetched concurrently while building the index
    pub index_concurrency: usize,
    /// Period of the background expiry sweep; disabled when absent
    pub sweep_interval_secs: Option<u64>,
    pub event_capacity: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            structure_ttl_secs: DEFAULT_TTL.as_secs(),
            document_ttl_secs: DEFAULT_TTL.as_secs(),
            related_ttl_secs: DEFAULT_TTL.as_secs(),
            structure_cache_size: DEFAULT_MAX_SIZE,
            document_cache_size: DEFAULT_MAX_SIZE,
            related_cache_size: related::DEFAULT_CACHE_SIZE,
            search_max_results: index::DEFAULT_MAX_RESULTS,
            related_limit: related::DEFAULT_LIMIT,
            search_debounce_ms: 300,
            preview_length: index::DEFAULT_PREVIEW_LENGTH,
            index_concurrency: index::DEFAULT_CONCURRENCY,
            sweep_interval_secs: None,
            event_capacity: crate::events::DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl BrowserConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content, path)
    }

    /// Load from `path`, or from the default location when it exists, or defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path).await;
        }

        match default_config_path() {
            Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load(&path).await
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("structure_cache_size", self.structure_cache_size),
            ("document_cache_size", self.document_cache_size),
            ("related_cache_size", self.related_cache_size),
            ("search_max_results", self.search_max_results),
            ("related_limit", self.related_limit),
            ("index_concurrency", self.index_concurrency),
            ("event_capacity", self.event_capacity),
        ];
        for (key, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if let Some(secs) = self.sweep_interval_secs
            && secs < MIN_SWEEP_INTERVAL_SECS
        {
            return Err(ConfigError::Invalid {
                key: "sweep_interval_secs",
                reason: format!("must be at least {} seconds, got {}", MIN_SWEEP_INTERVAL_SECS, secs),
            });
        }

        Ok(())
    }

    pub fn structure_ttl(&self) -> Duration {
        Duration::from_secs(self.structure_ttl_secs)
    }

    pub fn document_ttl(&self) -> Duration {
        Duration::from_secs(self.document_ttl_secs)
    }

    pub fn related_ttl(&self) -> Duration {
        Duration::from_secs(self.related_ttl_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }
}

/// `<config dir>/docshelf/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("docshelf").join("config.toml"))
}
