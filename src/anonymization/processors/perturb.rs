//! Perturb processor - uniform noise on numeric values

use super::{PreparedOptions, ProcessContext, Processor};
use crate::anonymization::rules::{MethodId, RuleOptions};
use crate::domain::{CloakError, ElementNode, Result};
use rand::Rng;
use serde_json::{Number, Value};

const SPAN_OPTION: &str = "span";
const RANGE_TYPE_OPTION: &str = "rangeType";
const ROUND_TO_OPTION: &str = "roundTo";
const DEFAULT_ROUND_TO: u64 = 2;
const MAX_ROUND_TO: u64 = 28;

/// Field carrying the number of a Quantity-like element
const QUANTITY_VALUE_FIELD: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq)]
enum RangeType {
    Fixed,
    Proportional,
}

/// Parsed `perturb` rule options
#[derive(Debug, Clone, Copy)]
pub struct PerturbOptions {
    span: f64,
    range_type: RangeType,
    round_to: u64,
}

impl PerturbOptions {
    fn from_rule(options: &RuleOptions) -> Result<Self> {
        let span = options.get_f64(SPAN_OPTION)?.ok_or_else(|| {
            CloakError::Configuration(format!("perturb requires the '{SPAN_OPTION}' option"))
        })?;
        if !span.is_finite() || span < 0.0 {
            return Err(CloakError::Configuration(format!(
                "'{SPAN_OPTION}' must be a non-negative number, got {span}"
            )));
        }

        let range_type = match options.get_str(RANGE_TYPE_OPTION)? {
            None => RangeType::Fixed,
            Some(s) if s.eq_ignore_ascii_case("fixed") => RangeType::Fixed,
            Some(s) if s.eq_ignore_ascii_case("proportional") => RangeType::Proportional,
            Some(other) => {
                return Err(CloakError::Configuration(format!(
                    "'{RANGE_TYPE_OPTION}' must be 'fixed' or 'proportional', got '{other}'"
                )))
            }
        };

        let round_to = options.get_u64(ROUND_TO_OPTION)?.unwrap_or(DEFAULT_ROUND_TO);
        if round_to > MAX_ROUND_TO {
            return Err(CloakError::Configuration(format!(
                "'{ROUND_TO_OPTION}' must be at most {MAX_ROUND_TO}, got {round_to}"
            )));
        }

        Ok(Self {
            span,
            range_type,
            round_to,
        })
    }
}

/// Adds uniform noise in `[-span/2, span/2]`
///
/// With `rangeType = proportional` the span is a fraction of the value.
pub struct PerturbProcessor;

impl PerturbProcessor {
    /// Create a new perturb processor
    pub fn new() -> Self {
        Self
    }

    fn perturb(value: f64, options: &PerturbOptions) -> f64 {
        let span = match options.range_type {
            RangeType::Fixed => options.span,
            RangeType::Proportional => options.span * value.abs(),
        };
        let half = span / 2.0;
        let noise = if half > 0.0 {
            rand::thread_rng().gen_range(-half..=half)
        } else {
            0.0
        };
        round(value + noise, options.round_to)
    }

    fn perturb_leaf(leaf: &mut ElementNode, options: &PerturbOptions, location: &str) -> Result<()> {
        let number = match leaf.value() {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
        .ok_or_else(|| {
            CloakError::processing(
                MethodId::Perturb.canonical(),
                format!("Element {location} is not numeric"),
            )
        })?;

        let perturbed = Self::perturb(number, options);
        let value = if options.round_to == 0 {
            Value::Number(Number::from(perturbed as i64))
        } else {
            Number::from_f64(perturbed).map(Value::Number).ok_or_else(|| {
                CloakError::processing(
                    MethodId::Perturb.canonical(),
                    format!("Perturbed value for {location} is not representable"),
                )
            })?
        };
        leaf.set_value(value);
        Ok(())
    }
}

impl Default for PerturbProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn round(value: f64, decimals: u64) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

impl Processor for PerturbProcessor {
    fn method(&self) -> MethodId {
        MethodId::Perturb
    }

    fn prepare(&self, options: &RuleOptions) -> Result<PreparedOptions> {
        PerturbOptions::from_rule(options).map(PreparedOptions::Perturb)
    }

    fn process(
        &self,
        node: &mut ElementNode,
        context: &ProcessContext<'_>,
        options: &PreparedOptions,
    ) -> Result<()> {
        let PreparedOptions::Perturb(options) = options else {
            return Err(PreparedOptions::mismatch(MethodId::Perturb));
        };
        if node.is_primitive() {
            return Self::perturb_leaf(node, options, context.location);
        }
        match node.child_mut(QUANTITY_VALUE_FIELD) {
            Some(value) if value.is_primitive() => {
                Self::perturb_leaf(value, options, context.location)
            }
            _ => Err(CloakError::processing(
                MethodId::Perturb.canonical(),
                format!("Element {} has no numeric value to perturb", context.location),
            )),
        }
    }
}
