//! Filesystem-facing classification of logical entries

pub mod kind;

// Re-export commonly used types
pub use kind::{NodeType, classify, extension_of, type_table};
