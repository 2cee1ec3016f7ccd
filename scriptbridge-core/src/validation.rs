//! JSON schema validation of tool input
//!
//! Tool calls validate their argument mapping against the declared schema
//! before any script is synthesized. A failed validation keeps the raw
//! offending input so the caller can see exactly what was rejected.

use crate::error::{BridgeError, Result, ValidationError};
use serde_json::Value as JsonValue;

/// Validate JSON data against a schema
///
/// # Arguments
/// * `data` - The JSON data to validate
/// * `schema` - The JSON schema (draft 7) to validate against
///
/// # Returns
/// * `Ok(())` if validation passes
/// * `Err(BridgeError::Validation)` if the schema does not compile or the data does not match
///
/// # Example
/// ```rust,ignore
/// use serde_json::json;
/// use scriptbridge_core::validation::validate_json;
///
/// let schema = json!({
///     "type": "object",
///     "properties": { "query": { "type": "string" } },
///     "required": ["query"]
/// });
///
/// validate_json(&json!({"query": "rust"}), &schema)?;
/// ```
pub fn validate_json(data: &JsonValue, schema: &JsonValue) -> Result<()> {
    let validator = jsonschema::draft7::new(schema).map_err(|e| {
        BridgeError::Validation(ValidationError::InvalidSchema(format!(
            "Failed to compile schema: {}",
            e
        )))
    })?;

    let error_msgs: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();
    if !error_msgs.is_empty() {
        return Err(BridgeError::Validation(ValidationError::SchemaMismatch {
            message: error_msgs.join(", "),
            input: data.to_string(),
        }));
    }

    Ok(())
}

/// Validate the argument mapping of a tool call.
///
/// A tool without a declared schema accepts any input. On success the input
/// is handed back so it can flow straight into synthesis.
pub fn validate_tool_input(
    input: JsonValue,
    schema: Option<&JsonValue>,
) -> Result<JsonValue> {
    if let Some(schema) = schema {
        validate_json(&input, schema)?;
    }
    Ok(input)
}
