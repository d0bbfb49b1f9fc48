#![forbid(unsafe_code)]

use std::fmt;

use ring::digest;
use zeroize::Zeroize;

/// Length of the derived AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Salted SHA-256 over `salt || input`.
fn salted_sha256(salt: &str, input: &str) -> digest::Digest {
    let mut ctx = digest::Context::new(&digest::SHA256);
    ctx.update(salt.as_bytes());
    ctx.update(input.as_bytes());
    ctx.finish()
}

/// Physical name of a principal's root directory.
///
/// Deterministic and one-way: the same identity and salt always produce the
/// same lowercase hex label, so a principal's root is found without decryption.
pub fn root_label(identity: &str, salt: &str) -> String {
    hex::encode(salted_sha256(salt, identity).as_ref())
}

/// AES-256 key derived from a caller-supplied secret.
///
/// The raw secret is never used as cipher key material; it is hashed together
/// with the storage salt. Key bytes are zeroed on drop and are only reachable
/// through [`CipherKey::with_key`].
pub struct CipherKey {
    key: [u8; KEY_LEN],
}

impl CipherKey {
    /// Derive the cipher key as `SHA-256(salt || secret)`.
    pub fn derive(secret: &str, salt: &str) -> Self {
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(salted_sha256(salt, secret).as_ref());
        Self { key }
    }

    /// Scoped access to the raw key bytes.
    #[inline]
    pub fn with_key<R>(&self, f: impl FnOnce(&[u8; KEY_LEN]) -> R) -> R {
        f(&self.key)
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherKey").field("key", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_label_is_deterministic() {
        assert_eq!(root_label("alice", "salt"), root_label("alice", "salt"));
        assert_eq!(root_label("alice", "salt").len(), 64);
    }

    #[test]
    fn test_root_label_depends_on_identity_and_salt() {
        assert_ne!(root_label("alice", "salt"), root_label("bob", "salt"));
        assert_ne!(root_label("alice", "salt"), root_label("alice", "pepper"));
    }

    #[test]
    fn test_root_label_known_vector() {
        // sha256("abc")
        assert_eq!(
            root_label("bc", "a"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_derived_key_differs_from_secret() {
        let key = CipherKey::derive("secret", "No-salt");
        key.with_key(|k| {
            assert_ne!(&k[..6], b"secret");
            assert_eq!(k.len(), KEY_LEN);
        });
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = CipherKey::derive("secret", "No-salt");
        let b = CipherKey::derive("secret", "No-salt");
        let c = CipherKey::derive("other", "No-salt");
        let ka = a.with_key(|k| *k);
        assert_eq!(ka, b.with_key(|k| *k));
        assert_ne!(ka, c.with_key(|k| *k));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = CipherKey::derive("secret", "No-salt");
        assert!(format!("{key:?}").contains("redacted"));
    }
}
