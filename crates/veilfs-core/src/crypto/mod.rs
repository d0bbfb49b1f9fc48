//! Cryptographic primitives for segment and content encryption

pub mod codec;
pub mod keys;

use thiserror::Error;

/// Errors that can occur while decrypting a segment or file body.
///
/// All of these mean the data cannot be recovered with the key at hand. The
/// cipher mode is not authenticated, so a wrong key is usually reported as
/// [`CryptoError::DecryptionFailed`] (bad padding) but may also surface as
/// [`CryptoError::InvalidUtf8`] for names.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The encoded form is not `hex(iv):hex(ciphertext)`.
    ///
    /// **[INPUT ERROR]** The entry was not produced by this codec, or was truncated.
    #[error("Malformed ciphertext: {reason}")]
    MalformedCiphertext { reason: String },

    /// Padding check failed after CBC decryption.
    ///
    /// **[USER ERROR]** Almost always a wrong key; otherwise corruption.
    #[error("Decryption failed - wrong key or corrupted ciphertext")]
    DecryptionFailed,

    /// A decrypted segment name is not valid UTF-8.
    #[error("Decrypted segment is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

// Re-export commonly used types
pub use codec::SegmentCodec;
pub use keys::{CipherKey, root_label};
