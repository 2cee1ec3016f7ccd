//! Core type definitions for scriptbridge

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// One host-declared variable exposed to user code under `vars`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxVariable {
    pub name: String,

    #[serde(default)]
    pub value: String,

    #[serde(rename = "type", default)]
    pub variable_type: SandboxVariableType,
}

/// How a sandbox variable obtains its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SandboxVariableType {
    /// The declared value is used as-is
    #[default]
    Static,
    /// The value is read from the host process environment at call time
    Runtime,
}

impl SandboxVariable {
    pub fn new_static(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            variable_type: SandboxVariableType::Static,
        }
    }

    pub fn new_runtime(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            variable_type: SandboxVariableType::Runtime,
        }
    }
}

/// Fold declared variables into the `vars` mapping.
///
/// Runtime variables resolve to the environment variable of the same name,
/// or to an empty string when it is unset. Later declarations win.
pub fn prepare_sandbox_vars(variables: &[SandboxVariable]) -> Map<String, JsonValue> {
    let mut vars = Map::new();
    for variable in variables {
        let value = match variable.variable_type {
            SandboxVariableType::Static => variable.value.clone(),
            SandboxVariableType::Runtime => std::env::var(&variable.name).unwrap_or_default(),
        };
        vars.insert(variable.name.clone(), JsonValue::String(value));
    }
    vars
}

/// Metadata of the pipeline run, exposed to user code under `flow`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chatflow_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,

    /// Current pipeline input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Map<String, JsonValue>>,

    /// Any other host-provided keys
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl FlowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_chatflow_id(mut self, chatflow_id: impl Into<String>) -> Self {
        self.chatflow_id = Some(chatflow_id.into());
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Overlay per-call overrides on top of this context. Fields set in
    /// `overrides` win; unset fields keep the base value.
    pub fn merged(&self, overrides: &FlowContext) -> FlowContext {
        let mut extra = self.extra.clone();
        for (key, value) in &overrides.extra {
            extra.insert(key.clone(), value.clone());
        }
        FlowContext {
            chatflow_id: overrides.chatflow_id.clone().or_else(|| self.chatflow_id.clone()),
            session_id: overrides.session_id.clone().or_else(|| self.session_id.clone()),
            chat_id: overrides.chat_id.clone().or_else(|| self.chat_id.clone()),
            input: overrides.input.clone().or_else(|| self.input.clone()),
            state: overrides.state.clone().or_else(|| self.state.clone()),
            extra,
        }
    }

    /// Wire form of the context, as user code sees it
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_else(|_| JsonValue::Object(Map::new()))
    }
}

/// Everything one call needs. Immutable once handed to the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Raw user script body
    pub code: String,

    /// Top-level bindings for user code, in declaration order
    #[serde(default)]
    pub named_variables: Map<String, JsonValue>,

    /// Exposed under `vars`
    #[serde(default)]
    pub sandbox_variables: Map<String, JsonValue>,

    /// Exposed under `flow`
    #[serde(default)]
    pub flow_context: FlowContext,

    /// Overrides the configured interpreter for this call only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter_path: Option<String>,

    /// Overrides the configured timeout for this call only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn with_named_variables(mut self, variables: Map<String, JsonValue>) -> Self {
        self.named_variables = variables;
        self
    }

    pub fn with_named_variable(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.named_variables.insert(name.into(), value);
        self
    }

    pub fn with_sandbox_variables(mut self, variables: Map<String, JsonValue>) -> Self {
        self.sandbox_variables = variables;
        self
    }

    pub fn with_flow_context(mut self, flow: FlowContext) -> Self {
        self.flow_context = flow;
        self
    }

    pub fn with_interpreter_path(mut self, path: impl Into<String>) -> Self {
        self.interpreter_path = Some(path.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Which synthesis path a call takes. Chosen by the caller, never guessed
/// from the code text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Strategy {
    /// Schema-validated tool call; payload streamed on stdin
    Tool {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<JsonValue>,
    },
    /// Pipeline function node; payload inlined into the script
    FunctionNode,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Tool { .. } => write!(f, "tool"),
            Strategy::FunctionNode => write!(f, "function_node"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prepare_sandbox_vars_static_and_runtime() {
        let variables = vec![
            SandboxVariable::new_static("region", "eu-west-1"),
            SandboxVariable::new_runtime("SCRIPTBRIDGE_TEST_RUNTIME_VAR"),
            SandboxVariable::new_runtime("SCRIPTBRIDGE_TEST_UNSET_VAR"),
        ];

        temp_env::with_vars(
            [
                ("SCRIPTBRIDGE_TEST_RUNTIME_VAR", Some("from-env")),
                ("SCRIPTBRIDGE_TEST_UNSET_VAR", None),
            ],
            || {
                let vars = prepare_sandbox_vars(&variables);
                assert_eq!(vars["region"], json!("eu-west-1"));
                assert_eq!(vars["SCRIPTBRIDGE_TEST_RUNTIME_VAR"], json!("from-env"));
                assert_eq!(vars["SCRIPTBRIDGE_TEST_UNSET_VAR"], json!(""));
            },
        );
    }

    #[test]
    fn test_sandbox_variable_deserializes_type_field() {
        let variable: SandboxVariable =
            serde_json::from_value(json!({"name": "HOME", "type": "runtime"})).unwrap();
        assert_eq!(variable.variable_type, SandboxVariableType::Runtime);

        let variable: SandboxVariable =
            serde_json::from_value(json!({"name": "k", "value": "v"})).unwrap();
        assert_eq!(variable.variable_type, SandboxVariableType::Static);
    }

    #[test]
    fn test_flow_context_wire_form() {
        let flow = FlowContext::new()
            .with_chatflow_id("cf-1")
            .with_session_id("s-1")
            .with_input("hello")
            .with_extra("runId", json!("r-9"));

        assert_eq!(
            flow.to_json(),
            json!({"chatflowId": "cf-1", "sessionId": "s-1", "input": "hello", "runId": "r-9"})
        );
    }

    #[test]
    fn test_flow_context_merge_prefers_overrides() {
        let base = FlowContext::new()
            .with_session_id("base-session")
            .with_chat_id("base-chat")
            .with_extra("team", json!("a"));
        let overrides = FlowContext::new()
            .with_session_id("call-session")
            .with_extra("team", json!("b"));

        let merged = base.merged(&overrides);
        assert_eq!(merged.session_id.as_deref(), Some("call-session"));
        assert_eq!(merged.chat_id.as_deref(), Some("base-chat"));
        assert_eq!(merged.extra["team"], json!("b"));
    }

    #[test]
    fn test_named_variables_keep_declaration_order() {
        let request = ExecutionRequest::new("result = 1")
            .with_named_variable("zeta", json!(1))
            .with_named_variable("alpha", json!(2));
        let keys: Vec<&String> = request.named_variables.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_strategy_serde() {
        let tool: Strategy = serde_json::from_value(json!({"strategy": "tool"})).unwrap();
        assert_eq!(tool, Strategy::Tool { schema: None });
        let node: Strategy = serde_json::from_value(json!({"strategy": "function_node"})).unwrap();
        assert_eq!(node, Strategy::FunctionNode);
        assert_eq!(node.to_string(), "function_node");
    }
}
