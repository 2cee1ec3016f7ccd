//! Pipeline function nodes

use crate::error::{ExecutionError, ExecutionOutcome};
use crate::executor::ScriptExecutor;
use crate::supervisor::{ProcessSupervisor, ScriptRunner};
use scriptbridge_core::{prepare_sandbox_vars, ExecutionRequest, FlowContext, SandboxVariable, Strategy};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tracing::debug;

/// Normalize declared input variables
///
/// Accepts a mapping, JSON text encoding a mapping, or null (no variables).
/// String values that look like JSON objects are parsed when they parse and
/// kept as text otherwise.
pub fn parse_input_variables(raw: &JsonValue) -> Result<Map<String, JsonValue>, ExecutionError> {
    let variables = match raw {
        JsonValue::Null => return Ok(Map::new()),
        JsonValue::Object(map) => map.clone(),
        JsonValue::String(text) if text.trim().is_empty() => return Ok(Map::new()),
        JsonValue::String(text) => match serde_json::from_str::<JsonValue>(text) {
            Ok(JsonValue::Object(map)) => map,
            Ok(other) => {
                return Err(ExecutionError::InvalidInputVariables(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
            Err(e) => return Err(ExecutionError::InvalidInputVariables(e.to_string())),
        },
        other => {
            return Err(ExecutionError::InvalidInputVariables(format!(
                "expected a mapping or JSON text, got {}",
                json_type_name(other)
            )))
        }
    };

    Ok(variables
        .into_iter()
        .map(|(name, value)| (name, expand_object_text(value)))
        .collect())
}

fn expand_object_text(value: JsonValue) -> JsonValue {
    if let JsonValue::String(text) = &value {
        let trimmed = text.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            if let Ok(parsed @ JsonValue::Object(_)) = serde_json::from_str::<JsonValue>(trimmed) {
                return parsed;
            }
        }
    }
    value
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// A pipeline node whose body is user code
///
/// Each run binds `input_text` (the pipeline input), `vars`, `flow` and every
/// declared input variable, then returns whatever the code returns.
pub struct FunctionNodeExecutor<R: ScriptRunner = ProcessSupervisor> {
    code: String,
    input_variables: Map<String, JsonValue>,
    variables: Vec<SandboxVariable>,
    interpreter_path: Option<String>,
    executor: Arc<ScriptExecutor<R>>,
}

impl<R: ScriptRunner> FunctionNodeExecutor<R> {
    pub fn new(code: impl Into<String>, executor: Arc<ScriptExecutor<R>>) -> Self {
        Self {
            code: code.into(),
            input_variables: Map::new(),
            variables: Vec::new(),
            interpreter_path: None,
            executor,
        }
    }

    /// Declare input variables as a mapping or as JSON text
    pub fn with_input_variables(mut self, raw: &JsonValue) -> Result<Self, ExecutionError> {
        self.input_variables = parse_input_variables(raw)?;
        Ok(self)
    }

    pub fn with_variables(mut self, variables: Vec<SandboxVariable>) -> Self {
        self.variables = variables;
        self
    }

    /// Interpreter for this node only
    pub fn with_interpreter_path(mut self, path: impl Into<String>) -> Self {
        self.interpreter_path = Some(path.into());
        self
    }

    pub fn input_variables(&self) -> &Map<String, JsonValue> {
        &self.input_variables
    }

    /// Run the node on one pipeline input
    pub async fn run(&self, input: &str, flow: FlowContext) -> ExecutionOutcome {
        let mut request = ExecutionRequest::new(self.code.clone())
            .with_named_variables(self.input_variables.clone())
            .with_sandbox_variables(prepare_sandbox_vars(&self.variables))
            .with_flow_context(flow.with_input(input));

        if let Some(path) = &self.interpreter_path {
            request = request.with_interpreter_path(path.clone());
        }

        debug!(variables = self.input_variables.len(), "Running function node");
        self.executor.execute(&request, &Strategy::FunctionNode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::supervisor::MockScriptRunner;
    use scriptbridge_config::ExecutionConfig;
    use serde_json::json;

    #[test]
    fn test_mapping_input() {
        let parsed = parse_input_variables(&json!({"a": 1, "b": "two"})).unwrap();
        assert_eq!(parsed["a"], 1);
        assert_eq!(parsed["b"], "two");
    }

    #[test]
    fn test_json_text_input() {
        let parsed = parse_input_variables(&json!(r#"{"a": 1, "b": [1, 2]}"#)).unwrap();
        assert_eq!(parsed["a"], 1);
        assert_eq!(parsed["b"], json!([1, 2]));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(parse_input_variables(&JsonValue::Null).unwrap().is_empty());
        assert!(parse_input_variables(&json!("  ")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_text_rejected() {
        let err = parse_input_variables(&json!("{not json")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidInput);

        let err = parse_input_variables(&json!("[1, 2]")).unwrap_err();
        assert!(err.to_string().contains("array"));

        let err = parse_input_variables(&json!(5)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidInput);
    }

    #[test]
    fn test_object_text_values_expanded() {
        let parsed = parse_input_variables(&json!({
            "config": "{\"depth\": 2}",
            "broken": "{not json}",
            "plain": "hello",
        }))
        .unwrap();

        assert_eq!(parsed["config"], json!({"depth": 2}));
        assert_eq!(parsed["broken"], "{not json}");
        assert_eq!(parsed["plain"], "hello");
    }

    #[tokio::test]
    async fn test_run_builds_function_node_request() {
        let mut runner = MockScriptRunner::new();
        runner
            .expect_run()
            .times(1)
            .withf(|script, settings| {
                script.stdin_payload.is_none()
                    && script.source.contains(r#""input_text":"question""#)
                    && script.source.contains("a = __bridge_payload.get('a', None)")
                    && settings.interpreter_path == "python3"
            })
            .returning(|_, _| Ok("3".to_string()));

        let executor = Arc::new(ScriptExecutor::with_runner(ExecutionConfig::default(), runner));
        let node = FunctionNodeExecutor::new("result = a + b", executor)
            .with_input_variables(&json!({"a": 1, "b": 2}))
            .unwrap()
            .with_interpreter_path("python3");

        let value = node.run("question", FlowContext::new()).await.unwrap();
        assert_eq!(value, json!(3));
    }
}
