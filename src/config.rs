//! Configuration
//!
//! Settings come from `abcd.toml` (or the file named by `ABCD_CONFIG`) and
//! `ABCD_*` environment variables, with nested keys separated by `__`
//! (`ABCD_SEARCH__KEYWORD_SUFFIX=raw`).
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`ABCD_*`)
//! 2. Configuration file
//! 3. Default values

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compile::Backend;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "abcd.toml";

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV: &str = "ABCD_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Document-store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Collection holding the structures.
    pub collection: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            collection: "atoms".to_string(),
        }
    }
}

/// Search-index settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Index holding the structures.
    pub index: String,
    /// Sub-field carrying the untokenized form of string fields; empty to
    /// query string fields directly.
    pub keyword_suffix: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index: "atoms".to_string(),
            keyword_suffix: "keyword".to_string(),
        }
    }
}

/// Query execution settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Limit applied to `find` when the caller gives none.
    pub default_limit: Option<usize>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Active backend.
    pub backend: Backend,
    pub document: DocumentConfig,
    pub search: SearchConfig,
    pub query: QueryConfig,
}

impl Config {
    /// Loads configuration from `ABCD_CONFIG`, falling back to `abcd.toml`.
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_FILE.to_string());
        Self::load_from_path(path)
    }

    /// Loads configuration from a specific file path, then applies the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ABCD_").ignore(&["config"]).split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), backend = %config.backend, "loaded configuration");
        Ok(config)
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str))
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.document.collection.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "document.collection".to_string(),
                message: "collection name cannot be empty".to_string(),
            });
        }

        if self.search.index.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "search.index".to_string(),
                message: "index name cannot be empty".to_string(),
            });
        }

        if self.search.keyword_suffix.contains('.') {
            return Err(ConfigError::InvalidValue {
                key: "search.keyword_suffix".to_string(),
                message: format!(
                    "suffix '{}' must be a single path segment",
                    self.search.keyword_suffix
                ),
            });
        }

        if self.query.default_limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "query.default_limit".to_string(),
                message: "limit must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Same configuration with a different backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }
}
