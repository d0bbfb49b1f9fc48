//! Shared helpers for storage integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use veilfs_core::{Storage, StorageConfig};

pub const TEST_IDENTITY: &str = "alice";
pub const TEST_KEY: &str = "secret";

/// A temporary storage directory plus a storage opened on it.
pub struct TestStorage {
    pub temp_dir: TempDir,
    pub storage: Storage,
}

impl TestStorage {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = open(temp_dir.path(), TEST_IDENTITY, TEST_KEY);
        Self { temp_dir, storage }
    }

    pub fn base_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A fresh instance over the same directory, with an empty tree.
    pub fn reopen(&self) -> Storage {
        open(self.base_dir(), TEST_IDENTITY, TEST_KEY)
    }

    pub fn open_as(&self, identity: &str, key: &str) -> Storage {
        open(self.base_dir(), identity, key)
    }
}

pub fn open(base_dir: &Path, identity: &str, key: &str) -> Storage {
    Storage::new(&StorageConfig::new(base_dir), identity, key)
}

/// Every path under `root`, relative to it, with `/` separators.
pub fn physical_entries(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| e.path().strip_prefix(root).expect("under root").to_path_buf())
        .collect()
}

/// Initialize a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
