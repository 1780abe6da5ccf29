//! Crypto-hash processor - keyed HMAC-SHA256 pseudonyms

use super::{primitive_text, PreparedOptions, ProcessContext, Processor};
use crate::anonymization::rules::{MethodId, RuleOptions};
use crate::config::SecretKey;
use crate::domain::{CloakError, ElementNode, Result};
use hmac::{Hmac, Mac};
use regex::Regex;
use secrecy::ExposeSecret;
use serde_json::Value;
use sha2::Sha256;
use std::sync::OnceLock;

const REFERENCE_FIELD: &str = "reference";

fn literal_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<prefix>(?:.*/)?[A-Z][A-Za-z]+/)(?P<id>[A-Za-z0-9\-.]{1,64})(?P<history>/_history/.+)?$")
            .expect("reference pattern is valid")
    })
}

/// Replaces values with a lower-case hex HMAC-SHA256 digest
///
/// Literal references (`Patient/123`) keep their type and only the id is
/// hashed, so references between anonymized resources still resolve when ids
/// are hashed with the same key.
pub struct CryptoHashProcessor {
    key: Option<SecretKey>,
}

impl CryptoHashProcessor {
    /// Create a new crypto-hash processor
    pub fn new(key: Option<SecretKey>) -> Self {
        Self { key }
    }

    /// Hash a string with the configured key
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no key is configured
    pub fn hash(&self, input: &str) -> Result<String> {
        let key = match &self.key {
            Some(key) if !key.expose_secret().is_blank() => key.expose_secret(),
            _ => {
                return Err(CloakError::Configuration(
                    "cryptoHash requires parameters.crypto_hash_key".to_string(),
                ))
            }
        };
        let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
            .map_err(|e| CloakError::Configuration(format!("Invalid crypto hash key: {e}")))?;
        mac.update(input.as_bytes());
        Ok(format!("{:x}", mac.finalize().into_bytes()))
    }

    fn hash_primitive(&self, leaf: &mut ElementNode) -> Result<()> {
        let Some(value) = leaf.value() else {
            return Ok(());
        };
        let text = primitive_text(value);

        let hashed = if leaf.name() == REFERENCE_FIELD {
            match literal_reference().captures(&text) {
                Some(caps) => format!(
                    "{}{}{}",
                    &caps["prefix"],
                    self.hash(&caps["id"])?,
                    caps.name("history").map_or("", |m| m.as_str())
                ),
                None => self.hash(&text)?,
            }
        } else {
            self.hash(&text)?
        };

        leaf.set_value(Value::String(hashed));
        Ok(())
    }
}

impl Processor for CryptoHashProcessor {
    fn method(&self) -> MethodId {
        MethodId::CryptoHash
    }

    fn prepare(&self, _options: &RuleOptions) -> Result<PreparedOptions> {
        self.hash("").map(|_| PreparedOptions::None)
    }

    fn process(
        &self,
        node: &mut ElementNode,
        _context: &ProcessContext<'_>,
        _options: &PreparedOptions,
    ) -> Result<()> {
        node.try_for_each_primitive_mut(&mut |leaf| self.hash_primitive(leaf))
    }
}
