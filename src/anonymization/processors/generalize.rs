//! Generalize processor - maps values onto coarser categories
//!
//! ```toml
//! [[rules]]
//! path = "Patient.address.postalCode"
//! method = "generalize"
//! otherValues = "redact"
//! cases = [
//!     { range = [0, 18], value = "child" },
//!     { in = ["M", "F"], value = "binary" },
//!     { pattern = "^021", value = "021**" },
//! ]
//! ```

use super::{primitive_text, PreparedOptions, ProcessContext, Processor};
use crate::anonymization::rules::{MethodId, RuleOptions};
use crate::domain::{CloakError, ElementNode, Result};
use regex::Regex;
use serde_json::Value;

const CASES_OPTION: &str = "cases";
const OTHER_VALUES_OPTION: &str = "otherValues";

#[derive(Debug, Clone, Copy, PartialEq)]
enum OtherValues {
    Redact,
    Keep,
}

#[derive(Debug, Clone)]
enum Condition {
    /// `[lo, hi)`; a null bound is open
    Range(Option<f64>, Option<f64>),
    In(Vec<String>),
    Pattern(Regex),
}

impl Condition {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Range(lo, hi) => {
                let number = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                number.is_some_and(|n| {
                    lo.map_or(true, |lo| n >= lo) && hi.map_or(true, |hi| n < hi)
                })
            }
            Self::In(values) => {
                let text = primitive_text(value);
                values.iter().any(|v| *v == text)
            }
            Self::Pattern(regex) => regex.is_match(&primitive_text(value)),
        }
    }
}

#[derive(Debug, Clone)]
struct Case {
    condition: Condition,
    value: Value,
}

/// Parsed `generalize` rule options with compiled patterns
#[derive(Debug, Clone)]
pub struct GeneralizeOptions {
    cases: Vec<Case>,
    other_values: OtherValues,
}

fn option_error(index: usize, message: impl std::fmt::Display) -> CloakError {
    CloakError::Configuration(format!("{CASES_OPTION}[{index}]: {message}"))
}

fn parse_bound(bound: &Value, index: usize) -> Result<Option<f64>> {
    match bound {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        other => Err(option_error(index, format!("range bound must be a number, got {other}"))),
    }
}

fn parse_case(index: usize, case: &Value) -> Result<Case> {
    let Value::Object(case) = case else {
        return Err(option_error(index, "case must be an object"));
    };
    let value = match case.get("value") {
        None => return Err(option_error(index, "case requires a 'value'")),
        Some(Value::Array(_) | Value::Object(_)) => {
            return Err(option_error(index, "'value' must be a primitive"))
        }
        Some(value) => value.clone(),
    };

    let condition = if let Some(range) = case.get("range") {
        match range.as_array().map(Vec::as_slice) {
            Some([lo, hi]) => Condition::Range(parse_bound(lo, index)?, parse_bound(hi, index)?),
            _ => return Err(option_error(index, "'range' must be a [low, high] pair")),
        }
    } else if let Some(values) = case.get("in") {
        let values = values
            .as_array()
            .ok_or_else(|| option_error(index, "'in' must be a list"))?;
        Condition::In(values.iter().map(primitive_text).collect())
    } else if let Some(pattern) = case.get("pattern") {
        let pattern = pattern
            .as_str()
            .ok_or_else(|| option_error(index, "'pattern' must be a string"))?;
        let regex = Regex::new(pattern)
            .map_err(|e| option_error(index, format!("invalid pattern: {e}")))?;
        Condition::Pattern(regex)
    } else {
        return Err(option_error(index, "case needs one of 'range', 'in' or 'pattern'"));
    };

    Ok(Case { condition, value })
}

impl GeneralizeOptions {
    fn from_rule(options: &RuleOptions) -> Result<Self> {
        let cases = match options.get(CASES_OPTION) {
            Some(Value::Array(cases)) if !cases.is_empty() => cases
                .iter()
                .enumerate()
                .map(|(index, case)| parse_case(index, case))
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(CloakError::Configuration(format!(
                    "generalize requires a non-empty '{CASES_OPTION}' list"
                )))
            }
        };

        let other_values = match options.get_str(OTHER_VALUES_OPTION)? {
            None => OtherValues::Redact,
            Some(s) if s.eq_ignore_ascii_case("redact") => OtherValues::Redact,
            Some(s) if s.eq_ignore_ascii_case("keep") => OtherValues::Keep,
            Some(other) => {
                return Err(CloakError::Configuration(format!(
                    "'{OTHER_VALUES_OPTION}' must be 'redact' or 'keep', got '{other}'"
                )))
            }
        };

        Ok(Self {
            cases,
            other_values,
        })
    }

    fn generalize(&self, leaf: &mut ElementNode) {
        let Some(current) = leaf.value() else {
            return;
        };
        let replacement = self
            .cases
            .iter()
            .find(|case| case.condition.matches(current))
            .map(|case| case.value.clone());

        match (replacement, self.other_values) {
            (Some(value), _) => leaf.set_value(value),
            (None, OtherValues::Redact) => leaf.clear(),
            (None, OtherValues::Keep) => {}
        }
    }
}

/// Replaces values by the first matching case
pub struct GeneralizeProcessor;

impl GeneralizeProcessor {
    /// Create a new generalize processor
    pub fn new() -> Self {
        Self
    }
}

impl Default for GeneralizeProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for GeneralizeProcessor {
    fn method(&self) -> MethodId {
        MethodId::Generalize
    }

    fn prepare(&self, options: &RuleOptions) -> Result<PreparedOptions> {
        GeneralizeOptions::from_rule(options).map(PreparedOptions::Generalize)
    }

    fn process(
        &self,
        node: &mut ElementNode,
        _context: &ProcessContext<'_>,
        options: &PreparedOptions,
    ) -> Result<()> {
        let PreparedOptions::Generalize(options) = options else {
            return Err(PreparedOptions::mismatch(MethodId::Generalize));
        };
        node.try_for_each_primitive_mut(&mut |leaf| {
            options.generalize(leaf);
            Ok(())
        })
    }
}
