//! Script-backed tools

use crate::error::{ExecutionError, ExecutionOutcome};
use crate::executor::ScriptExecutor;
use crate::supervisor::{ProcessSupervisor, ScriptRunner};
use scriptbridge_core::{
    prepare_sandbox_vars, validate_tool_input, ExecutionRequest, FlowContext, SandboxVariable,
    Strategy,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

/// A named tool whose behaviour is a user-supplied script
///
/// Arguments are validated against `schema` (when set), exposed to the script
/// as `input` and as top-level names, and the script's result is the tool's
/// result. `flow` is the tool's base flow context; per-call overrides are
/// merged on top of it.
pub struct DynamicScriptTool<R: ScriptRunner = ProcessSupervisor> {
    pub name: String,
    pub description: String,
    pub code: String,
    pub schema: Option<JsonValue>,
    pub return_direct: bool,
    pub variables: Vec<SandboxVariable>,
    pub flow: FlowContext,
    executor: Arc<ScriptExecutor<R>>,
}

impl<R: ScriptRunner> DynamicScriptTool<R> {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        code: impl Into<String>,
        executor: Arc<ScriptExecutor<R>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            code: code.into(),
            schema: None,
            return_direct: false,
            variables: Vec::new(),
            flow: FlowContext::default(),
            executor,
        }
    }

    pub fn with_schema(mut self, schema: JsonValue) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_return_direct(mut self, return_direct: bool) -> Self {
        self.return_direct = return_direct;
        self
    }

    pub fn with_variables(mut self, variables: Vec<SandboxVariable>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_flow(mut self, flow: FlowContext) -> Self {
        self.flow = flow;
        self
    }

    /// Run the tool with one argument mapping
    pub async fn run(&self, arg: JsonValue, flow_override: Option<&FlowContext>) -> ExecutionOutcome {
        let input = match arg {
            JsonValue::Object(map) => map,
            other => {
                let other = validate_tool_input(other, self.schema.as_ref())?;
                return Err(ExecutionError::InputSchema {
                    message: "Tool input must be a JSON object".to_string(),
                    input: other.to_string(),
                });
            }
        };

        let flow = match flow_override {
            Some(overrides) => self.flow.merged(overrides),
            None => self.flow.clone(),
        };

        let request = ExecutionRequest::new(self.code.clone())
            .with_named_variables(input)
            .with_sandbox_variables(prepare_sandbox_vars(&self.variables))
            .with_flow_context(flow);

        debug!(tool = %self.name, "Running script tool");
        self.executor
            .execute(
                &request,
                &Strategy::Tool {
                    schema: self.schema.clone(),
                },
            )
            .await
    }

    /// Run the tool and render the result as text: strings as-is, anything
    /// else as JSON
    pub async fn call(
        &self,
        arg: JsonValue,
        flow_override: Option<&FlowContext>,
    ) -> Result<String, ExecutionError> {
        Ok(match self.run(arg, flow_override).await? {
            JsonValue::String(text) => text,
            other => other.to_string(),
        })
    }
}
