//! Key material handling using the secrecy crate
//!
//! Anonymization keys (crypto-hash, encryption, date-shift) are loaded into
//! [`SecretKey`] values. Memory is zeroed on drop, `Debug` output is redacted,
//! and the raw bytes are only reachable through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use cloak::config::secret_key;
//! use secrecy::ExposeSecret;
//!
//! let key = secret_key("hash-key-2024".to_string());
//! assert_eq!(key.expose_secret().as_bytes(), b"hash-key-2024");
//! assert!(!format!("{key:?}").contains("hash-key-2024"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Raw key text, zeroized on drop
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct KeyMaterial(String);

impl CloneableSecret for KeyMaterial {}
impl DebugSecret for KeyMaterial {}
impl SerializableSecret for KeyMaterial {}

impl From<String> for KeyMaterial {
    fn from(s: String) -> Self {
        KeyMaterial(s)
    }
}

impl KeyMaterial {
    /// Key bytes as fed to HMAC / key derivation
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Key text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the key is empty (or whitespace only)
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Serialize for KeyMaterial {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeyMaterial {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(KeyMaterial)
    }
}

/// A protected anonymization key
pub type SecretKey = Secret<KeyMaterial>;

/// Wrap a string as a [`SecretKey`]
#[inline]
pub fn secret_key(value: String) -> SecretKey {
    Secret::new(KeyMaterial::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_key_debug_redacted() {
        let key = secret_key("very-secret-hash-key".to_string());
        let debug_output = format!("{key:?}");
        assert!(!debug_output.contains("very-secret-hash-key"));
    }

    #[test]
    fn test_blank_key() {
        assert!(secret_key("   ".to_string()).expose_secret().is_blank());
        assert!(!secret_key("k".to_string()).expose_secret().is_blank());
    }

    #[test]
    fn test_secret_key_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Keys {
            crypto_hash_key: SecretKey,
        }

        let keys: Keys = toml::from_str(r#"crypto_hash_key = "abc123""#).unwrap();
        assert_eq!(keys.crypto_hash_key.expose_secret().as_str(), "abc123");
    }
}
