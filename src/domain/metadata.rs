//! Metadata blobs carrying an inline `tags` field

use crate::domain::tag::strip_new_marker;
use crate::error::{Result, TagmapError};
use serde_json::{Map, Value};

const TAGS_FIELD: &str = "tags";

/// A decoded JSON metadata object
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    fields: Map<String, Value>,
}

impl Metadata {
    /// Parse a blob; an empty blob is an empty object
    pub fn parse(blob: &str) -> Result<Self> {
        if blob.trim().is_empty() {
            return Ok(Metadata { fields: Map::new() });
        }
        match serde_json::from_str::<Value>(blob)? {
            Value::Object(fields) => Ok(Metadata { fields }),
            other => Err(TagmapError::Validation(format!(
                "Metadata must be a JSON object, found {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Raw tokens of the `tags` field.
    ///
    /// A string is split on commas, an array yields one token per element.
    /// A missing or null field yields a single empty token.
    pub fn tag_tokens(&self) -> Vec<String> {
        match self.fields.get(TAGS_FIELD) {
            Some(Value::String(joined)) => joined.split(',').map(str::to_string).collect(),
            Some(Value::Array(items)) => items.iter().map(value_to_token).collect(),
            Some(Value::Null) | None => vec![String::new()],
            Some(other) => vec![value_to_token(other)],
        }
    }

    pub fn has_tags_field(&self) -> bool {
        self.fields.contains_key(TAGS_FIELD)
    }

    /// Replace the `tags` field with a comma-joined list
    pub fn set_tags<S: AsRef<str>>(&mut self, names: &[S]) {
        let joined = names
            .iter()
            .map(|n| n.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        self.fields.insert(TAGS_FIELD.to_string(), Value::String(joined));
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }
}

/// Strip `#new#` markers from the blob's tags and rewrite the blob.
///
/// Returns the cleaned tokens; a lone empty token normalizes to no tokens.
pub fn normalize_inline_tags(blob: &mut String) -> Result<Vec<String>> {
    let mut metadata = Metadata::parse(blob)?;
    let cleaned: Vec<String> = metadata
        .tag_tokens()
        .iter()
        .map(|token| strip_new_marker(token))
        .collect();

    if metadata.has_tags_field() {
        metadata.set_tags(cleaned.as_slice());
        *blob = metadata.to_json()?;
    }

    if cleaned.len() == 1 && cleaned[0].is_empty() {
        return Ok(Vec::new());
    }
    Ok(cleaned)
}

fn value_to_token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
