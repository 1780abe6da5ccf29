//! FHIR JSON parsing and serialization
//!
//! Field order is preserved through a round trip, so an untouched record
//! serializes the same way it was read.

use crate::domain::context::ResultExt;
use crate::domain::{Resource, Result};
use serde_json::Value;

/// Parse one FHIR JSON resource
///
/// # Errors
///
/// Returns a parse error for malformed JSON or a value that is not a typed
/// resource object
pub fn parse(text: &str) -> Result<Resource> {
    let value: Value = serde_json::from_str(text)?;
    Resource::from_value(value)
}

/// Serialize a resource, compact or pretty-printed
///
/// # Errors
///
/// Returns a parse error if serialization fails
pub fn serialize(resource: &Resource, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(resource.as_map())?
    } else {
        serde_json::to_string(resource.as_map())?
    };
    Ok(text)
}

/// Non-blank lines of an NDJSON document with their 1-based line numbers
pub fn ndjson_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

/// Parse every line of an NDJSON document
///
/// # Errors
///
/// Returns the first parse error, tagged with its line number
pub fn parse_ndjson(text: &str) -> Result<Vec<Resource>> {
    ndjson_lines(text)
        .map(|(line_number, line)| parse(line).with_context(|| format!("line {line_number}")))
        .collect()
}

/// Serialize resources as NDJSON, one compact resource per line
///
/// # Errors
///
/// Returns a parse error if serialization fails
pub fn serialize_ndjson<'a>(resources: impl IntoIterator<Item = &'a Resource>) -> Result<String> {
    let mut out = String::new();
    for resource in resources {
        out.push_str(&serialize(resource, false)?);
        out.push('\n');
    }
    Ok(out)
}
