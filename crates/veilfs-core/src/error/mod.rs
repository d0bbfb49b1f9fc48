//! Error types for storage operations
//!
//! Read, write, delete, rename and mkdir report failures through
//! [`StorageError`]. Crawl failures never surface here: a directory entry that
//! cannot be listed, stat'ed or decrypted is skipped and logged instead.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::crypto::CryptoError;

/// Context for storage operations, providing debugging information.
#[derive(Debug, Clone, Default)]
pub struct StorageOpContext {
    /// The logical (plaintext) path being operated on
    pub logical_path: Option<String>,
    /// The physical (ciphertext) path on disk
    pub physical_path: Option<PathBuf>,
}

impl StorageOpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logical_path(mut self, path: impl Into<String>) -> Self {
        self.logical_path = Some(path.into());
        self
    }

    pub fn with_physical_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.physical_path = Some(path.into());
        self
    }
}

impl std::fmt::Display for StorageOpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();

        if let Some(ref path) = self.logical_path {
            parts.push(format!("path '{path}'"));
        }
        if let Some(ref physical) = self.physical_path {
            // Physical names are long hex strings; the tail is enough to identify them
            let shown: Vec<char> = physical.display().to_string().chars().collect();
            let shown: String = if shown.len() > 48 {
                format!("...{}", shown[shown.len() - 45..].iter().collect::<String>())
            } else {
                shown.into_iter().collect()
            };
            parts.push(format!("at {shown}"));
        }

        if parts.is_empty() {
            write!(f, "(no context)")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors returned by [`Storage`](crate::Storage) operations.
///
/// # Classification
///
/// `NotFound`, `Collision`, `InvalidPath`, `NotAFile` and `NotADirectory` are
/// caller mistakes. `Decrypt` and `Io` point at a wrong key or an environment
/// problem. See [`StorageError::is_client_error`].
#[derive(Error, Debug)]
pub enum StorageError {
    /// No node matches the logical path exactly.
    ///
    /// A prefix match (an existing ancestor) is still `NotFound`.
    #[error("Path not found: '{path}'")]
    NotFound { path: String },

    /// The target already exists where a fresh entry was expected.
    #[error("'{path}' already exists {context}")]
    Collision {
        path: String,
        context: StorageOpContext,
    },

    /// A name or file body could not be decrypted.
    #[error("Cannot decrypt {context}: {source}")]
    Decrypt {
        #[source]
        source: CryptoError,
        context: StorageOpContext,
    },

    /// The underlying filesystem call failed.
    #[error("IO error for {context}: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        context: StorageOpContext,
    },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Expected file but found directory: '{path}'")]
    NotAFile { path: String },

    #[error("Expected directory but found file: '{path}'")]
    NotADirectory { path: String },
}

impl StorageError {
    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        StorageError::NotFound { path: path.into() }
    }

    pub(crate) fn io(source: std::io::Error, context: StorageOpContext) -> Self {
        StorageError::Io { source, context }
    }

    /// True for errors the caller can correct by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StorageError::Decrypt { .. } | StorageError::Io { .. })
    }

    /// True for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl From<std::io::Error> for StorageError {
    fn from(source: std::io::Error) -> Self {
        StorageError::Io {
            source,
            context: StorageOpContext::new(),
        }
    }
}
