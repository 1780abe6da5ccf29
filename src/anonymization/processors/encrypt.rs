//! Encrypt processor - AES-256-GCM, base64 output

use super::{primitive_text, PreparedOptions, ProcessContext, Processor};
use crate::anonymization::rules::{MethodId, RuleOptions};
use crate::config::SecretKey;
use crate::domain::{CloakError, ElementNode, Result};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use secrecy::ExposeSecret;
use serde_json::Value;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

/// Replaces values with `base64(nonce || ciphertext)`
///
/// The AES key is the SHA-256 digest of the configured key text, so any
/// non-blank key length is accepted.
pub struct EncryptProcessor {
    cipher: Option<Aes256Gcm>,
}

impl EncryptProcessor {
    /// Create a new encrypt processor
    pub fn new(key: Option<&SecretKey>) -> Self {
        let cipher = key
            .map(|key| key.expose_secret())
            .filter(|key| !key.is_blank())
            .map(|key| {
                let digest = Sha256::digest(key.as_bytes());
                Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest))
            });
        Self { cipher }
    }

    fn cipher(&self) -> Result<&Aes256Gcm> {
        self.cipher.as_ref().ok_or_else(|| {
            CloakError::Configuration("encrypt requires parameters.encrypt_key".to_string())
        })
    }

    /// Encrypt a string
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = self.cipher()?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CloakError::processing(MethodId::Encrypt.canonical(), e.to_string()))?;

        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    /// Reverse [`EncryptProcessor::encrypt`] with the same key
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let cipher = self.cipher()?;
        let fail = |message: String| CloakError::processing(MethodId::Encrypt.canonical(), message);

        let payload = STANDARD
            .decode(encoded)
            .map_err(|e| fail(format!("Invalid base64 payload: {e}")))?;
        if payload.len() < NONCE_LEN {
            return Err(fail("Payload shorter than the nonce".to_string()));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| fail("Decryption failed".to_string()))?;
        String::from_utf8(plaintext).map_err(|e| fail(e.to_string()))
    }
}

impl Processor for EncryptProcessor {
    fn method(&self) -> MethodId {
        MethodId::Encrypt
    }

    fn prepare(&self, _options: &RuleOptions) -> Result<PreparedOptions> {
        self.cipher().map(|_| PreparedOptions::None)
    }

    fn process(
        &self,
        node: &mut ElementNode,
        _context: &ProcessContext<'_>,
        _options: &PreparedOptions,
    ) -> Result<()> {
        node.try_for_each_primitive_mut(&mut |leaf| {
            if let Some(value) = leaf.value() {
                let encrypted = self.encrypt(&primitive_text(value))?;
                leaf.set_value(Value::String(encrypted));
            }
            Ok(())
        })
    }
}
