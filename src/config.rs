//! Configuration management for the validation engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (instance.toml)
//! - Environment variables (INSTANCE__*)
//!
//! ## Example config file (instance.toml):
//! ```toml
//! [validation]
//! mapping_failures = "collect"
//!
//! [registry]
//! freeze_on_build = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration for the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Composite validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Type registry settings
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Validation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// How mapping validation reports failing entries
    #[serde(default)]
    pub mapping_failures: MappingFailures,
}

/// Failure reporting for mapping entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingFailures {
    /// The first invalid key or value aborts validation
    #[default]
    FailFast,
    /// Every invalid entry is reported, keyed by the entry's key
    Collect,
}

/// Registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Freeze the registry as soon as builtins are installed
    #[serde(default)]
    pub freeze_on_build: bool,
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, optionally from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["instance.toml", ".instance.toml", "config/instance.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "instance", "instance") {
            let xdg_config = config_dir.config_dir().join("instance.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("INSTANCE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
