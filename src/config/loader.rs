//! Configuration Loader
//!
//! Environment-aware loading: a base TOML file, an optional per-environment
//! TOML file, then `DOCSTORE_BATCH__*` environment variables, layered with the
//! `config` crate and validated before use.

use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::BatchWriterConfig;
use crate::constants::{environments, system};
use crate::error::ConfigurationError;

const BASE_FILE_STEM: &str = "docstore-batch";

/// Loads [`BatchWriterConfig`] from files and the environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `./config` with the detected environment
    pub fn load() -> Result<BatchWriterConfig, ConfigurationError> {
        Self::load_from_directory(None)
    }

    /// Load from a specific directory with the detected environment
    pub fn load_from_directory(
        config_dir: Option<PathBuf>,
    ) -> Result<BatchWriterConfig, ConfigurationError> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load with an explicit environment, leaving process variables untouched
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<BatchWriterConfig, ConfigurationError> {
        Self::build(config_dir, environment, None)
    }

    /// Load with explicit environment-variable overrides instead of the process
    /// environment. Keys use the same `DOCSTORE_BATCH__FIELD` form.
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: HashMap<String, String>,
    ) -> Result<BatchWriterConfig, ConfigurationError> {
        Self::build(config_dir, environment, Some(overrides))
    }

    /// `DOCSTORE_ENV`, then `APP_ENV`, defaulting to development
    pub fn detect_environment() -> String {
        env::var("DOCSTORE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| environments::DEVELOPMENT.to_string())
            .to_lowercase()
    }

    fn build(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> Result<BatchWriterConfig, ConfigurationError> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading batch writer configuration for environment '{}' from {}",
            environment,
            config_directory.display()
        );

        let base_path = config_directory.join(format!("{BASE_FILE_STEM}.toml"));
        let env_path = config_directory.join(format!("{BASE_FILE_STEM}.{environment}.toml"));

        let environment_source = Environment::with_prefix(system::CONFIG_ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(overrides);

        let config: BatchWriterConfig = Config::builder()
            .add_source(optional_toml(&base_path))
            .add_source(optional_toml(&env_path))
            .add_source(environment_source)
            .build()?
            .try_deserialize()?;

        config.validate()?;

        info!(
            environment = %environment,
            max_group_size = config.max_group_size,
            mode = %config.mode,
            dry_run = config.dry_run,
            production = config.production,
            "⚙️ Batch writer configuration loaded"
        );

        Ok(config)
    }
}

fn optional_toml(path: &Path) -> impl config::Source + Send + Sync + 'static {
    File::from(path).format(FileFormat::Toml).required(false)
}
