//! Segment and content codec.
//!
//! Every path segment and every file body is encrypted with AES-256-CBC
//! (PKCS#7 padding) under a fresh random IV and stored as the printable,
//! self-describing string `hex(iv) ":" hex(ciphertext)`.
//!
//! Encryption is randomized: encrypting the same segment twice yields two
//! different physical names. Physical names therefore cannot be recomputed
//! from logical ones and must be discovered by crawling.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

use super::CryptoError;
use super::keys::CipherKey;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block and IV size in bytes.
pub const IV_LEN: usize = 16;

const SEPARATOR: char = ':';

/// Longest file name, in bytes, common filesystems accept.
pub const MAX_PHYSICAL_NAME_LEN: usize = 255;

/// Longest segment, in bytes, whose physical name fits [`MAX_PHYSICAL_NAME_LEN`].
pub const MAX_SEGMENT_LEN: usize = 95;

/// Length of the encoded form of a `plaintext_len`-byte payload.
pub const fn encoded_len(plaintext_len: usize) -> usize {
    IV_LEN * 2 + 1 + (plaintext_len / IV_LEN + 1) * IV_LEN * 2
}

/// Encrypts and decrypts segments and file bodies under one derived key.
#[derive(Debug)]
pub struct SegmentCodec {
    key: CipherKey,
}

impl SegmentCodec {
    pub fn new(key: CipherKey) -> Self {
        Self { key }
    }

    /// Derive the cipher key from `secret` and build a codec around it.
    pub fn from_secret(secret: &str, salt: &str) -> Self {
        Self::new(CipherKey::derive(secret, salt))
    }

    /// Encrypt an arbitrary payload into its encoded form.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> String {
        let iv: [u8; IV_LEN] = rand::random();
        let ciphertext = self.key.with_key(|key| {
            Aes256CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
        });

        let mut encoded = String::with_capacity(IV_LEN * 2 + 1 + ciphertext.len() * 2);
        encoded.push_str(&hex::encode(iv));
        encoded.push(SEPARATOR);
        encoded.push_str(&hex::encode(ciphertext));
        encoded
    }

    /// Decrypt an encoded payload using its embedded IV.
    ///
    /// # Errors
    ///
    /// - `CryptoError::MalformedCiphertext`: not `hex(iv):hex(ciphertext)`, or
    ///   the lengths are not block-aligned
    /// - `CryptoError::DecryptionFailed`: padding check failed (wrong key or corruption)
    pub fn decrypt_bytes(&self, encoded: &str) -> Result<Vec<u8>, CryptoError> {
        let (iv_hex, ciphertext_hex) =
            encoded
                .trim()
                .split_once(SEPARATOR)
                .ok_or_else(|| CryptoError::MalformedCiphertext {
                    reason: "missing IV separator".to_string(),
                })?;

        let iv: [u8; IV_LEN] = hex::decode(iv_hex)
            .map_err(|e| CryptoError::MalformedCiphertext { reason: format!("IV: {e}") })?
            .try_into()
            .map_err(|iv: Vec<u8>| CryptoError::MalformedCiphertext {
                reason: format!("IV must be {IV_LEN} bytes, got {}", iv.len()),
            })?;

        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|e| CryptoError::MalformedCiphertext { reason: format!("ciphertext: {e}") })?;
        if ciphertext.is_empty() || ciphertext.len() % IV_LEN != 0 {
            return Err(CryptoError::MalformedCiphertext {
                reason: format!("ciphertext length {} is not block aligned", ciphertext.len()),
            });
        }

        self.key.with_key(|key| {
            Aes256CbcDec::new(key.into(), &iv.into())
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
                .map_err(|_| CryptoError::DecryptionFailed)
        })
    }

    /// Encrypt one logical path segment into a physical name.
    pub fn encrypt_segment(&self, segment: &str) -> String {
        self.encrypt_bytes(segment.as_bytes())
    }

    /// Recover a logical segment from a physical name.
    pub fn decrypt_segment(&self, physical: &str) -> Result<String, CryptoError> {
        let bytes = self.decrypt_bytes(physical)?;
        Ok(String::from_utf8(bytes)?)
    }
}
