//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::env::apply_env;
use crate::config::lenient::scrub;
use crate::config::schema::HealthConfig;
use crate::config::validation::{sanitize, ConfigWarning};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A loaded configuration plus every correction applied while loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: HealthConfig,
    pub warnings: Vec<ConfigWarning>,
}

/// Parse a TOML file without environment overrides or sanitising.
///
/// Malformed option values fall back to their defaults and are reported as
/// warnings; only unreadable files and broken TOML structure are errors.
pub fn read_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<LoadedConfig, ConfigError> {
    let mut doc: toml::Table = toml::from_str(content)?;
    let warnings = scrub(&mut doc);
    let config = toml::Value::Table(doc).try_into()?;

    Ok(LoadedConfig { config, warnings })
}

/// Load configuration: optional TOML file, then environment, then sanitise.
pub fn load(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let LoadedConfig { mut config, mut warnings } = match path {
        Some(path) => read_config(path)?,
        None => LoadedConfig {
            config: HealthConfig::default(),
            warnings: Vec::new(),
        },
    };

    warnings.extend(apply_env(&mut config));
    warnings.extend(sanitize(&mut config));

    Ok(LoadedConfig { config, warnings })
}

impl LoadedConfig {
    /// Emit collected warnings. Call once logging is initialised.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!(key = %warning.key, "{}", warning.message);
        }
    }
}
