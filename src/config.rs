//! Configuration handling for poolwire
//!
//! Every tag name, well-known component id and adapter class the pool pass
//! refers to lives in [`PassConfig`]. Configuration is read from an explicit
//! file, else from `~/.config/poolwire/config.toml`, else defaults apply.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::AdapterClasses;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Tag names read or written by the pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagNames {
    /// Marks a component as a cache pool
    pub pool: String,
    /// Lifecycle reset hook added for the `reset` attribute
    pub reset: String,
    /// Marks components the reverse lookup service may resolve
    pub reversible: String,
    /// Added to every clearer receiving a pool group
    pub pool_clearer: String,
    /// Added to the system clearer only
    pub kernel_cache_clearer: String,
}

impl Default for TagNames {
    fn default() -> Self {
        Self {
            pool: "cache.pool".to_string(),
            reset: "kernel.reset".to_string(),
            reversible: "container.reversible".to_string(),
            pool_clearer: "cache.pool.clearer".to_string(),
            kernel_cache_clearer: "kernel.cache_clearer".to_string(),
        }
    }
}

/// Ids of components the pass looks up or removes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceIds {
    pub early_expiration_handler: String,
    pub global_clearer: String,
    pub system_clearer: String,
    pub pool_list_command: String,
    pub invalidate_tags_command: String,
    pub reverse_container: String,
}

impl Default for ServiceIds {
    fn default() -> Self {
        Self {
            early_expiration_handler: "cache.early_expiration_handler".to_string(),
            global_clearer: "cache.global_clearer".to_string(),
            system_clearer: "cache.system_clearer".to_string(),
            pool_list_command: "console.command.cache_pool_list".to_string(),
            invalidate_tags_command: "console.command.cache_pool_invalidate_tags".to_string(),
            reverse_container: "reverse_container".to_string(),
        }
    }
}

/// Parameters the namespace seed is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedParameters {
    /// Explicit seed, used verbatim when defined
    pub seed: String,
    pub project_dir: String,
    pub container_class: String,
}

impl Default for SeedParameters {
    fn default() -> Self {
        Self {
            seed: "cache.prefix.seed".to_string(),
            project_dir: "kernel.project_dir".to_string(),
            container_class: "kernel.container_class".to_string(),
        }
    }
}

/// Classes and methods of the definitions the pass synthesizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryNames {
    /// Class owning the connection factory for DSN providers
    pub connection_class: String,
    pub connection_method: String,
    /// Class owning the duration normalizer for `default_lifetime`
    pub duration_class: String,
    pub duration_method: String,
    /// Decorator wrapping pools with early expiration
    pub early_expiration_dispatcher: String,
    /// Pool method receiving the decorator
    pub callback_wrapper_method: String,
}

impl Default for FactoryNames {
    fn default() -> Self {
        Self {
            connection_class: "Symfony\\Component\\Cache\\Adapter\\AbstractAdapter".to_string(),
            connection_method: "createConnection".to_string(),
            duration_class: "Symfony\\Component\\DependencyInjection\\ParameterNormalizer".to_string(),
            duration_method: "normalizeDuration".to_string(),
            early_expiration_dispatcher:
                "Symfony\\Component\\Cache\\Messenger\\EarlyExpirationDispatcher".to_string(),
            callback_wrapper_method: "setCallbackWrapper".to_string(),
        }
    }
}

/// Everything the cache pool pass needs to know about its surroundings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PassConfig {
    pub tags: TagNames,
    pub services: ServiceIds,
    pub seed: SeedParameters,
    pub adapters: AdapterClasses,
    pub factories: FactoryNames,
}

impl PassConfig {
    /// Loads configuration from `path`, the global location, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_file(path)?,
            None => Self::load_global()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "poolwire", "poolwire").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global() -> Result<Self> {
        let config_path = match Self::global_config_dir() {
            Some(dir) => dir.join("config.toml"),
            None => return Ok(Self::default()),
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_file(&config_path)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Parses a TOML configuration document
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Rejects configurations the pass cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.pool.trim().is_empty() {
            return Err(ConfigError::Invalid("tags.pool must not be empty".to_string()));
        }

        let adapters = &self.adapters;
        if adapters.chain == adapters.array || adapters.chain == adapters.null {
            return Err(ConfigError::Invalid(
                "adapters.chain must differ from the array and null adapters".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = PassConfig::default();

        assert_eq!(config.tags.pool, "cache.pool");
        assert_eq!(config.services.global_clearer, "cache.global_clearer");
        assert_eq!(config.seed.seed, "cache.prefix.seed");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[tags]
pool = "app.pool"

[adapters]
chain = "App\\Chain"
"#;

        let config = PassConfig::parse(toml).unwrap();
        assert_eq!(config.tags.pool, "app.pool");
        assert_eq!(config.tags.reset, "kernel.reset");
        assert_eq!(config.adapters.chain, "App\\Chain");
        assert_eq!(config.adapters.array, AdapterClasses::default().array);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PassConfig::parse("[tags]\npool = \"\"\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        assert!(matches!(
            PassConfig::parse("tags = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("poolwire.toml");
        fs::write(&path, "[services]\nsystem_clearer = \"app.clearer\"\n").unwrap();

        let config = PassConfig::load(Some(&path)).unwrap();
        assert_eq!(config.services.system_clearer, "app.clearer");

        assert!(PassConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
