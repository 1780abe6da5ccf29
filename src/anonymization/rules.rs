//! Anonymization methods and the ordered rule set

use crate::anonymization::processors::PreparedOptions;
use crate::anonymization::registry::ProcessorRegistry;
use crate::anonymization::selector::PathSelector;
use crate::config::RuleConfig;
use crate::domain::{CloakError, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The closed set of anonymization methods
///
/// Parsing is case-insensitive; [`MethodId::canonical`] gives the upper-case
/// form used in logs and errors.
///
/// ```
/// use cloak::anonymization::MethodId;
///
/// let method: MethodId = "dateShift".parse().unwrap();
/// assert_eq!(method, MethodId::DateShift);
/// assert_eq!(method.canonical(), "DATESHIFT");
/// assert!("scramble".parse::<MethodId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodId {
    DateShift,
    Redact,
    CryptoHash,
    Encrypt,
    Substitute,
    Perturb,
    Keep,
    Generalize,
}

impl MethodId {
    /// Every method, in registry order
    pub const ALL: [MethodId; 8] = [
        MethodId::DateShift,
        MethodId::Redact,
        MethodId::CryptoHash,
        MethodId::Encrypt,
        MethodId::Substitute,
        MethodId::Perturb,
        MethodId::Keep,
        MethodId::Generalize,
    ];

    /// Upper-case identifier
    pub fn canonical(&self) -> &'static str {
        match self {
            Self::DateShift => "DATESHIFT",
            Self::Redact => "REDACT",
            Self::CryptoHash => "CRYPTOHASH",
            Self::Encrypt => "ENCRYPT",
            Self::Substitute => "SUBSTITUTE",
            Self::Perturb => "PERTURB",
            Self::Keep => "KEEP",
            Self::Generalize => "GENERALIZE",
        }
    }
}

impl FromStr for MethodId {
    type Err = CloakError;

    fn from_str(s: &str) -> Result<Self> {
        let canonical = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|m| m.canonical() == canonical)
            .ok_or_else(|| {
                CloakError::Configuration(format!(
                    "Unknown anonymization method '{s}'. Expected one of: {}",
                    Self::ALL.map(|m| m.canonical().to_lowercase()).join(", ")
                ))
            })
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Method-specific options attached to a rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOptions(Map<String, Value>);

impl RuleOptions {
    /// Wrap an option map
    pub fn new(options: Map<String, Value>) -> Self {
        Self(options)
    }

    /// Raw option value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the option is present
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Numeric option
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the option is present but not a number
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(CloakError::Configuration(format!(
                "Option '{key}' must be a number, got {other}"
            ))),
        }
    }

    /// Non-negative integer option
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the option is present but not a non-negative integer
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                CloakError::Configuration(format!(
                    "Option '{key}' must be a non-negative integer, got {value}"
                ))
            }),
        }
    }

    /// String option
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the option is present but not a string
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(CloakError::Configuration(format!(
                "Option '{key}' must be a string, got {other}"
            ))),
        }
    }
}

/// One resolved rule: where, how, and with which options
#[derive(Debug, Clone)]
pub struct AnonymizationRule {
    selector: PathSelector,
    method: MethodId,
    options: RuleOptions,
    prepared: PreparedOptions,
}

impl AnonymizationRule {
    /// Create a rule from parsed parts
    ///
    /// The options stay unprepared until [`RuleSet::prepare`] runs.
    pub fn new(selector: PathSelector, method: MethodId, options: RuleOptions) -> Self {
        Self {
            selector,
            method,
            options,
            prepared: PreparedOptions::None,
        }
    }

    /// Resolve a configured rule
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown method or an invalid selector
    pub fn from_config(rule: &RuleConfig) -> Result<Self> {
        let method: MethodId = rule.method.parse()?;
        let selector: PathSelector = rule.path.parse()?;
        Ok(Self::new(selector, method, RuleOptions::new(rule.options.clone())))
    }

    /// Path selector
    pub fn selector(&self) -> &PathSelector {
        &self.selector
    }

    /// Method
    pub fn method(&self) -> MethodId {
        self.method
    }

    /// Options as configured
    pub fn options(&self) -> &RuleOptions {
        &self.options
    }

    /// Options as parsed by the rule's processor
    pub fn prepared(&self) -> &PreparedOptions {
        &self.prepared
    }
}

/// Ordered, immutable sequence of rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<AnonymizationRule>,
}

impl RuleSet {
    /// Resolve every configured rule, preserving declaration order
    ///
    /// # Errors
    ///
    /// Returns the first configuration error, tagged with the rule index
    pub fn from_config(rules: &[RuleConfig]) -> Result<Self> {
        let rules = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                AnonymizationRule::from_config(rule).map_err(|e| match e {
                    CloakError::Configuration(msg) => {
                        CloakError::Configuration(format!("rules[{index}] ({}): {msg}", rule.path))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Check every rule against its processor and keep the parsed options
    ///
    /// # Errors
    ///
    /// Returns the first configuration error, tagged with the rule index
    pub fn prepare(&mut self, registry: &ProcessorRegistry) -> Result<()> {
        for (index, rule) in self.rules.iter_mut().enumerate() {
            rule.prepared = registry
                .get(rule.method)?
                .prepare(&rule.options)
                .map_err(|e| match e {
                    CloakError::Configuration(msg) => CloakError::Configuration(format!(
                        "rules[{index}] ({}): {msg}",
                        rule.selector
                    )),
                    other => other,
                })?;
        }
        Ok(())
    }

    /// Rules in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, AnonymizationRule> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a AnonymizationRule;
    type IntoIter = std::slice::Iter<'a, AnonymizationRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
