//! Configuration file support for the veilfs CLI.
//!
//! Configuration is stored at `~/.config/veilfs/config.toml` (XDG standard)
//! or `~/Library/Application Support/com.veilfs.veilfs/config.toml` on macOS.
//! `VEILFS_CONFIG` points at a different file.
//!
//! # Example configuration
//!
//! ```toml
//! [defaults]
//! storage_dir = "/srv/veilfs"
//! identity = "alice"
//! hash_salt = "pepper"
//! ```
//!
//! The key is never read from the file. Command-line flags and environment
//! variables take precedence over every value here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use veilfs_core::StorageConfig;

/// Overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "VEILFS_CONFIG";

/// Main configuration structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Default settings applied to all commands
    #[serde(default)]
    pub defaults: Defaults,
}

/// Default settings
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Defaults {
    /// Shared storage directory
    pub storage_dir: Option<PathBuf>,

    /// Principal used when `--identity` is not given
    pub identity: Option<String>,

    /// Salt for root labels and key derivation
    pub hash_salt: Option<String>,
}

/// Settings that must be present before a tree can be opened.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("No identity given. Pass --identity, set VEILFS_IDENTITY, or add `identity` under [defaults] in {0}")]
    MissingIdentity(String),

    #[error("No key given. Pass --key or set VEILFS_KEY")]
    MissingKey,
}

impl Config {
    /// Load configuration from the default path, or return empty config if not found.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Storage configuration with command-line values layered over the file.
    pub fn storage_config(&self, storage_dir: Option<&Path>, salt: Option<&str>) -> StorageConfig {
        let mut config = StorageConfig::default();
        if let Some(dir) = storage_dir.or(self.defaults.storage_dir.as_deref()) {
            config.base_dir = dir.to_path_buf();
        }
        if let Some(salt) = salt.or(self.defaults.hash_salt.as_deref()) {
            config.hash_salt = salt.to_string();
        }
        config
    }

    pub fn identity(&self, from_cli: Option<&str>) -> Result<String, SettingsError> {
        from_cli
            .or(self.defaults.identity.as_deref())
            .map(str::to_string)
            .ok_or_else(|| SettingsError::MissingIdentity(display_config_path()))
    }
}

/// Get the path to the configuration file.
///
/// Uses XDG config directory on Linux, Application Support on macOS.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    let base_dirs = directories::BaseDirs::new()?;

    #[cfg(target_os = "macos")]
    {
        Some(
            base_dirs
                .home_dir()
                .join("Library/Application Support/com.veilfs.veilfs/config.toml"),
        )
    }

    #[cfg(not(target_os = "macos"))]
    {
        Some(base_dirs.config_dir().join("veilfs").join("config.toml"))
    }
}

fn display_config_path() -> String {
    config_path().map_or_else(
        || "~/.config/veilfs/config.toml".to_string(),
        |p| p.display().to_string(),
    )
}
