//! Configuration management for vizdiff.
//!
//! A `Config` is built once at startup from defaults, an optional TOML file,
//! and `DIFF_*` environment overrides (highest precedence), then handed to
//! every component by reference.

mod env;
mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for vizdiff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mask computation thresholds
    pub diff: DiffConfig,

    /// Batch driver settings
    pub batch: BatchConfig,

    /// Rendering settings
    pub render: RenderConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Input/output locations
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default file location, then apply
    /// environment overrides.
    ///
    /// Falls back to defaults when the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, ignoring any config file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.vizdiff.vizdiff/config.toml
    /// - Linux: ~/.config/vizdiff/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\vizdiff\config\config.toml
    ///
    /// Falls back to ~/.vizdiff/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "vizdiff", "vizdiff")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".vizdiff").join("config.toml")
            })
    }

    /// Resolved diff output directory (with ~ expansion).
    pub fn diff_dir(&self) -> PathBuf {
        expand(&self.output.diff_dir)
    }

    /// Resolved screenshot directory (with ~ expansion).
    pub fn screenshot_dir(&self) -> PathBuf {
        expand(&self.output.screenshot_dir)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}
