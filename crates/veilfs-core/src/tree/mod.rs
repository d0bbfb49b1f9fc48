//! Decrypted tree: node arena, crawler and path resolver

pub mod crawler;
pub mod node;
pub mod resolver;

// Re-export commonly used types
pub use crawler::{CrawlCounters, CrawledEntry, Crawler, graft};
pub use node::{Node, NodeArena, NodeId, ROOT_LOGICAL};
pub use resolver::{LogicalPath, MintedSegment, ResolvedPath, deep_path, find, lookup, normalize_path};
