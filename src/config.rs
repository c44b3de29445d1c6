//! Configuration management for Coursekit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoursekitError, Result};
use crate::pagination::LimitBounds;
use crate::ratelimit::PolicySet;

/// Prefix for environment overrides, e.g. `COURSEKIT__REGISTRY__CAPACITY=1000`.
pub const ENV_PREFIX: &str = "COURSEKIT";

/// Main configuration for a Coursekit host application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoursekitConfig {
    /// Rate limit registry sizing
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Rate limit policies per action
    #[serde(default)]
    pub policies: PolicySet,

    /// Page size bounds per listing endpoint
    #[serde(default = "default_listings")]
    pub listings: BTreeMap<String, LimitBounds>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CoursekitConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            policies: PolicySet::default(),
            listings: default_listings(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Rate limit registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum number of keys tracked at once
    #[serde(default = "default_capacity")]
    pub capacity: u64,

    /// Idle time in milliseconds after which a key is forgotten
    #[serde(default = "default_entry_ttl_ms")]
    pub entry_ttl_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            entry_ttl_ms: default_entry_ttl_ms(),
        }
    }
}

fn default_capacity() -> u64 {
    500
}

fn default_entry_ttl_ms() -> u64 {
    60_000
}

fn default_listings() -> BTreeMap<String, LimitBounds> {
    BTreeMap::from([
        ("courses".to_string(), LimitBounds::new(1, 50, 12)),
        ("reviews".to_string(), LimitBounds::new(1, 50, 10)),
        ("admin_users".to_string(), LimitBounds::new(1, 100, 20)),
    ])
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CoursekitConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: CoursekitConfig =
            serde_yaml::from_str(yaml).map_err(|e| CoursekitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional file layered with environment
    /// overrides under [`ENV_PREFIX`].
    ///
    /// Both layers merge key by key over the built-in defaults, so
    /// `COURSEKIT__LISTINGS__COURSES__MAX=24` only changes that one bound.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_layered(path, None)
    }

    /// `env` replaces the process environment when set.
    fn load_layered(path: Option<&Path>, env: Option<::config::Map<String, String>>) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&CoursekitConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: CoursekitConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make limits or bounds meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.registry.capacity == 0 {
            return Err(CoursekitError::Config(
                "registry.capacity must be at least 1".to_string(),
            ));
        }
        if self.registry.entry_ttl_ms == 0 {
            return Err(CoursekitError::Config(
                "registry.entry_ttl_ms must be at least 1".to_string(),
            ));
        }
        self.policies.validate()?;
        for (name, bounds) in &self.listings {
            bounds.validate(name)?;
        }
        Ok(())
    }

    /// Page size bounds for a listing endpoint.
    pub fn listing(&self, name: &str) -> Option<&LimitBounds> {
        self.listings.get(name)
    }
}
