//! Exit codes for the CLI.
//!
//! These follow common Unix conventions and provide meaningful
//! status information for scripting and automation.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Command-line usage error (bad arguments, missing identity or key, invalid path)
pub const USAGE_ERROR: u8 = 2;

/// Stored data could not be decrypted (wrong key or corrupt file)
pub const DECRYPT_FAILED: u8 = 4;

/// Permission denied on the storage directory
pub const PERMISSION_DENIED: u8 = 5;

/// File or directory not found (within the tree)
pub const NOT_FOUND: u8 = 7;

/// Target already exists
pub const COLLISION: u8 = 9;
