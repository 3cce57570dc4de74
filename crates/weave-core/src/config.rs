//! Engine configuration
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! expansion_cache_capacity = 1024
//! strict_declarations = true
//! log_filter = "weave_core=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of expanded classes kept in memory
    pub expansion_cache_capacity: u64,
    /// Fail on ordering declarations naming unknown transformers
    pub strict_declarations: bool,
    /// `tracing` filter directive installed by [`EngineConfig::init_tracing`]
    pub log_filter: String,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With expansion cache capacity
    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.expansion_cache_capacity = capacity;
        self
    }

    /// With strict declaration checking
    #[inline]
    #[must_use]
    pub fn with_strict_declarations(mut self, strict: bool) -> Self {
        self.strict_declarations = strict;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML, unknown keys or a zero cache capacity
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Install the global fmt subscriber with `log_filter`
    ///
    /// Returns `false` if a subscriber was already installed.
    pub fn init_tracing(&self) -> bool {
        crate::logging::init_tracing(&self.log_filter)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns error if the cache capacity is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expansion_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "expansion_cache_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expansion_cache_capacity: 512,
            strict_declarations: false,
            log_filter: "info".to_string(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML did not match the configuration schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
