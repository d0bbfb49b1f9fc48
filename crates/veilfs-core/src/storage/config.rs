//! Storage configuration.
//!
//! # Environment
//!
//! | Variable             | Default     | Meaning                                   |
//! |----------------------|-------------|-------------------------------------------|
//! | `VEILFS_STORAGE_DIR` | `./storage` | Shared directory holding every principal  |
//! | `HASH_SALT`          | `No-salt`   | Salt for root labels and key derivation   |
//!
//! Changing the salt changes every root label and every derived key, so
//! existing trees become unreachable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const STORAGE_DIR_ENV: &str = "VEILFS_STORAGE_DIR";
pub const HASH_SALT_ENV: &str = "HASH_SALT";

pub const DEFAULT_STORAGE_DIR: &str = "storage";
pub const DEFAULT_HASH_SALT: &str = "No-salt";

/// Where principals' trees live and how their names are derived.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Shared physical directory; each principal owns one child of it.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Salt mixed into root labels and cipher key derivation.
    #[serde(default = "default_hash_salt")]
    pub hash_salt: String,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_DIR)
}

fn default_hash_salt() -> String {
    DEFAULT_HASH_SALT.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            hash_salt: default_hash_salt(),
        }
    }
}

impl StorageConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_hash_salt(mut self, salt: impl Into<String>) -> Self {
        self.hash_salt = salt.into();
        self
    }

    /// Build from `VEILFS_STORAGE_DIR` and `HASH_SALT`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name| lookup(name).filter(|v: &String| !v.is_empty());
        Self {
            base_dir: non_empty(STORAGE_DIR_ENV).map_or_else(default_base_dir, PathBuf::from),
            hash_salt: non_empty(HASH_SALT_ENV).unwrap_or_else(default_hash_salt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.base_dir, PathBuf::from("storage"));
        assert_eq!(config.hash_salt, "No-salt");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> =
            [(STORAGE_DIR_ENV, "/srv/veil"), (HASH_SALT_ENV, "pepper")].into();
        let config = StorageConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.base_dir, PathBuf::from("/srv/veil"));
        assert_eq!(config.hash_salt, "pepper");
    }

    #[test]
    fn test_empty_values_fall_back() {
        let config = StorageConfig::from_lookup(|_| Some(String::new()));
        assert_eq!(config, StorageConfig::default());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StorageConfig = serde_json::from_str(r#"{"base_dir":"/data"}"#).unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/data"));
        assert_eq!(config.hash_salt, DEFAULT_HASH_SALT);
    }

    #[test]
    fn test_builder() {
        let config = StorageConfig::new("/tmp/x").with_hash_salt("s");
        assert_eq!(config.base_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.hash_salt, "s");
    }
}
