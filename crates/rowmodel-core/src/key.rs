//! Deterministic cache-key derivation.
//!
//! Keys are BLAKE3 keyed hashes of the input text. The hashing key itself is
//! derived from the configured secret and context, so two deployments with
//! different contexts never produce the same key for the same input.
//!
//! This is a key-construction helper for caches, not an authentication
//! primitive.

use crate::config::KeyConfig;
use crate::error::Result;

/// Length of a derived key in hex characters.
pub const KEY_HEX_LEN: usize = blake3::OUT_LEN * 2;

/// Derives cache keys from a configured secret.
#[derive(Clone)]
pub struct KeyDeriver {
    key: [u8; blake3::KEY_LEN],
}

impl KeyDeriver {
    pub fn new(config: &KeyConfig) -> Self {
        Self {
            key: blake3::derive_key(config.context(), config.secret()),
        }
    }

    /// Build from [`KeyConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(&KeyConfig::from_env()?))
    }

    /// Hex digest of `value` under this deriver's key.
    pub fn make_key(&self, value: &str) -> String {
        let hash = blake3::keyed_hash(&self.key, value.as_bytes());
        hex::encode(hash.as_bytes())
    }
}

impl std::fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDeriver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deriver(secret: &str, context: &str) -> KeyDeriver {
        KeyDeriver::new(&KeyConfig::new(secret).unwrap().with_context(context))
    }

    #[test]
    fn test_deterministic() {
        let a = deriver("secret", "ctx");
        let b = deriver("secret", "ctx");
        assert_eq!(a.make_key("user:1"), b.make_key("user:1"));
    }

    #[test]
    fn test_hex_length() {
        let key = deriver("secret", "ctx").make_key("");
        assert_eq!(key.len(), KEY_HEX_LEN);
        assert_eq!(KEY_HEX_LEN, 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_inputs_secrets_and_contexts_differ() {
        let base = deriver("secret", "ctx");
        assert_ne!(base.make_key("user:1"), base.make_key("user:2"));
        assert_ne!(
            base.make_key("user:1"),
            deriver("other", "ctx").make_key("user:1")
        );
        assert_ne!(
            base.make_key("user:1"),
            deriver("secret", "other").make_key("user:1")
        );
    }

    #[test]
    fn test_not_a_plain_hash() {
        let key = deriver("secret", "ctx").make_key("user:1");
        assert_ne!(key, blake3::hash(b"user:1").to_hex().to_string());
    }
}
