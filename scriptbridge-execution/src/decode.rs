//! Result decoding

use serde_json::Value as JsonValue;
use tracing::debug;

/// What a script printed, interpreted
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedOutput {
    Json(JsonValue),
    /// Output that is not JSON, returned verbatim
    Text(String),
}

impl DecodedOutput {
    pub fn into_value(self) -> JsonValue {
        match self {
            DecodedOutput::Json(value) => value,
            DecodedOutput::Text(text) => JsonValue::String(text),
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, DecodedOutput::Json(_))
    }
}

/// Decode trimmed stdout: JSON first, plain text otherwise. Never fails.
pub fn decode_output(stdout: &str) -> DecodedOutput {
    match serde_json::from_str::<JsonValue>(stdout) {
        Ok(value) => DecodedOutput::Json(value),
        Err(e) => {
            debug!(error = %e, len = stdout.len(), "Script output is not JSON, returning raw text");
            DecodedOutput::Text(stdout.to_string())
        }
    }
}
