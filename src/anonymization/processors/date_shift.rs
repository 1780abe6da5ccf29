//! Date-shift processor
//!
//! Every date in a matched node moves by the same number of days for a given
//! key and key prefix. The offset lies in `[-50, 50]` and is derived from
//! HMAC-SHA256 over the effective prefix, so it is stable across runs and
//! machines but cannot be recovered without the key.

use super::{PreparedOptions, ProcessContext, Processor};
use crate::anonymization::context::ResolvedContext;
use crate::anonymization::rules::{MethodId, RuleOptions};
use crate::config::{DateShiftScope, ParameterConfig, SecretKey};
use crate::domain::{CloakError, ElementNode, Result};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use regex::Regex;
use secrecy::ExposeSecret;
use serde_json::Value;
use sha2::Sha256;
use std::sync::OnceLock;

/// Largest shift in either direction, in days
pub const MAX_SHIFT_DAYS: i64 = 50;

/// Ages above this are collapsed when partial dates are kept
pub(crate) const MAX_DISCLOSED_AGE: i32 = 89;

/// A FHIR date, dateTime or instant value
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FhirDate {
    Year(i32),
    YearMonth(i32, u32),
    Date(NaiveDate),
    DateTime(NaiveDate),
}

impl FhirDate {
    pub(crate) fn year(&self) -> i32 {
        match self {
            Self::Year(y) | Self::YearMonth(y, _) => *y,
            Self::Date(d) | Self::DateTime(d) => d.year(),
        }
    }

    /// Whether the year alone would reveal an age above 89
    pub(crate) fn implies_protected_age(&self) -> bool {
        Utc::now().year() - self.year() > MAX_DISCLOSED_AGE
    }
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(\d{4})(?:-(\d{2})(?:-(\d{2})(T\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:\d{2})?)?)?)?$",
        )
        .expect("date pattern is valid")
    })
}

/// Parse a FHIR date-like string
pub(crate) fn parse_fhir_date(text: &str) -> Option<FhirDate> {
    let caps = date_pattern().captures(text)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let Some(month) = caps.get(2) else {
        return Some(FhirDate::Year(year));
    };
    let month: u32 = month.as_str().parse().ok()?;
    let Some(day) = caps.get(3) else {
        return (1..=12).contains(&month).then_some(FhirDate::YearMonth(year, month));
    };
    let date = NaiveDate::from_ymd_opt(year, month, day.as_str().parse().ok()?)?;
    if caps.get(4).is_some() {
        Some(FhirDate::DateTime(date))
    } else {
        Some(FhirDate::Date(date))
    }
}

/// Date-shift key material and scope, fixed at engine construction
#[derive(Debug, Clone)]
pub struct DateShiftParameters {
    key: Option<SecretKey>,
    scope: DateShiftScope,
    key_prefix: String,
    enable_partial_dates: bool,
}

impl DateShiftParameters {
    /// Combine configured parameters with a resolved context
    pub fn new(parameters: &ParameterConfig, context: &ResolvedContext) -> Self {
        Self {
            key: parameters.date_shift_key.clone(),
            scope: context.scope(),
            key_prefix: context.key_prefix().to_string(),
            enable_partial_dates: parameters.enable_partial_dates_for_redact,
        }
    }

    /// Scope
    pub fn scope(&self) -> DateShiftScope {
        self.scope
    }

    /// Prefix resolved at construction
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}

/// Date-shift processor
pub struct DateShiftProcessor {
    parameters: DateShiftParameters,
}

impl DateShiftProcessor {
    /// Create a new date-shift processor
    pub fn new(parameters: DateShiftParameters) -> Self {
        Self { parameters }
    }

    /// The string that, together with the key, determines the offset for a node
    ///
    /// File and folder scopes use the prefix resolved at construction; resource
    /// scope keys by the enclosing resource.
    pub fn effective_key_prefix(&self, context: &ProcessContext<'_>) -> String {
        match self.parameters.scope {
            DateShiftScope::Resource => match context.resource_id {
                Some(id) => format!("{}/{}", context.resource_type, id),
                None => context.resource_type.to_string(),
            },
            DateShiftScope::File | DateShiftScope::Folder => self.parameters.key_prefix.clone(),
        }
    }

    /// Offset in days for an effective prefix
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no date-shift key is configured
    pub fn offset_days(&self, effective_prefix: &str) -> Result<i64> {
        let key = self.key()?;
        let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
            .map_err(|e| CloakError::Configuration(format!("Invalid date shift key: {e}")))?;
        mac.update(effective_prefix.as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);
        let span = (2 * MAX_SHIFT_DAYS + 1) as u64;
        Ok((u64::from_be_bytes(seed) % span) as i64 - MAX_SHIFT_DAYS)
    }

    fn key(&self) -> Result<&crate::config::KeyMaterial> {
        match &self.parameters.key {
            Some(key) if !key.expose_secret().is_blank() => Ok(key.expose_secret()),
            _ => Err(CloakError::Configuration(
                "dateShift requires parameters.date_shift_key".to_string(),
            )),
        }
    }

    fn shift_primitive(&self, leaf: &mut ElementNode, offset: i64) -> Result<()> {
        let Some(text) = leaf.value_str() else {
            return Err(CloakError::processing(
                MethodId::DateShift.canonical(),
                format!("'{}' is not a date", leaf.name()),
            ));
        };
        let Some(date) = parse_fhir_date(text) else {
            return Err(CloakError::processing(
                MethodId::DateShift.canonical(),
                format!("'{}' does not hold a FHIR date", leaf.name()),
            ));
        };

        match date {
            FhirDate::Date(d) | FhirDate::DateTime(d) => {
                let shifted = d
                    .checked_add_signed(Duration::days(offset))
                    .ok_or_else(|| {
                        CloakError::processing(MethodId::DateShift.canonical(), "date out of range")
                    })?;
                leaf.set_value(Value::String(shifted.format("%Y-%m-%d").to_string()));
            }
            partial @ (FhirDate::Year(_) | FhirDate::YearMonth(_, _)) => {
                if self.parameters.enable_partial_dates && !partial.implies_protected_age() {
                    leaf.set_value(Value::String(format!("{:04}", partial.year())));
                } else {
                    leaf.clear();
                }
            }
        }
        Ok(())
    }
}

impl Processor for DateShiftProcessor {
    fn method(&self) -> MethodId {
        MethodId::DateShift
    }

    fn prepare(&self, _options: &RuleOptions) -> Result<PreparedOptions> {
        self.key().map(|_| PreparedOptions::None)
    }

    fn process(
        &self,
        node: &mut ElementNode,
        context: &ProcessContext<'_>,
        _options: &PreparedOptions,
    ) -> Result<()> {
        let offset = self.offset_days(&self.effective_key_prefix(context))?;
        node.try_for_each_primitive_mut(&mut |leaf| self.shift_primitive(leaf, offset))
    }
}
