//! Per-principal encrypted virtual filesystem.
//!
//! Every principal gets a private tree under a shared storage directory. The
//! root directory is named by a salted hash of the identity; every name below
//! it, and every file body, is AES-256-CBC ciphertext under a key derived from
//! the caller's secret. Because encryption uses a fresh IV per call, physical
//! names cannot be recomputed from logical ones: the [`Storage`] engine crawls
//! the physical tree once, decrypts it into an in-memory node arena, and
//! resolves logical paths against that.

pub mod crypto;
pub mod error;
pub mod fs;
pub mod storage;
pub mod tree;

pub use error::{StorageError, StorageOpContext};
pub use fs::kind::{NodeType, classify, extension_of, type_table};
pub use storage::{CrawlStats, FileView, NodeSnapshot, Storage, StorageConfig, TreeExport};
