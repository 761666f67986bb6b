//! Backend record decoding
//!
//! The backend speaks a "positional, label-prefixed record" convention:
//! replies are JSON arrays (or objects keyed `"0"`, `"1"`, ...) of strings
//! like `"Message: credited"` / `"Status: 200"`. This module is the single
//! decoder for that format; nothing else in the crate parses those strings.
//!
//! Missing fields decode to an empty string (or the caller's default),
//! never an error. Malformed shapes surface as `WireError::Malformed` so
//! callers can map them to their own "unreachable/unknown" taxonomy.

use serde_json::Value;
use thiserror::Error;

/// Status code the backend uses for success, in both the activation probe
/// and the settlement reply.
pub const STATUS_OK: &str = "200";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Malformed backend record: {0}")]
    Malformed(String),
}

/// A decoded positional record.
///
/// Holds the positional string fields; labels are stripped on access so a
/// reply that omits the `"Status:"` prefix still decodes.
#[derive(Debug, Clone)]
pub struct PositionalRecord {
    fields: Vec<String>,
}

impl PositionalRecord {
    /// Decode a record from a backend JSON body.
    ///
    /// Accepts a JSON array of strings or an object with stringified index
    /// keys (`"0"`, `"1"`, ...). Non-string positional values are carried
    /// through via their display form. Extra non-positional keys are
    /// ignored here; callers that need them keep the raw `Value`.
    pub fn decode(body: &Value) -> Result<Self, WireError> {
        let mut fields = Vec::new();

        match body {
            Value::Array(items) => {
                for item in items {
                    fields.push(value_to_field(item));
                }
            }
            Value::Object(map) => {
                // Object form: collect "0", "1", ... until the first gap.
                let mut index = 0usize;
                while let Some(v) = map.get(&index.to_string()) {
                    fields.push(value_to_field(v));
                    index += 1;
                }
                if fields.is_empty() && !map.is_empty() {
                    // An object with no positional keys is not a record.
                    return Err(WireError::Malformed(
                        "no positional fields in object".to_string(),
                    ));
                }
            }
            other => {
                return Err(WireError::Malformed(format!(
                    "expected array or object, got {other}"
                )));
            }
        }

        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Positional field with its label prefix stripped and whitespace
    /// trimmed. Missing positions come back as `None`.
    pub fn labeled(&self, index: usize, label: &str) -> Option<String> {
        self.fields.get(index).map(|raw| {
            raw.strip_prefix(label)
                .unwrap_or(raw.as_str())
                .trim()
                .to_string()
        })
    }

    /// Like [`labeled`](Self::labeled), with a fallback for missing fields.
    pub fn labeled_or(&self, index: usize, label: &str, default: &str) -> String {
        self.labeled(index, label)
            .unwrap_or_else(|| default.to_string())
    }
}

fn value_to_field(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pull a fiat reference rate (`{ <asset>: { "usd": f64 } }`) out of a
/// backend reply, if present.
pub fn reference_rate(body: &Value, asset_id: &str) -> Option<f64> {
    body.get(asset_id)?.get("usd")?.as_f64()
}
