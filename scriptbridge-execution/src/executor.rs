//! Caller-facing execution facade

use crate::decode::decode_output;
use crate::error::ExecutionOutcome;
use crate::settings::ExecutionSettings;
use crate::supervisor::{ProcessSupervisor, ScriptRunner};
use scriptbridge_config::ExecutionConfig;
use scriptbridge_core::{validate_tool_input, ExecutionRequest, Strategy};
use scriptbridge_script::synthesizer_for;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

/// Validates, synthesizes, runs and decodes one call at a time
///
/// Holds only read-only configuration, so a single executor can serve any
/// number of concurrent calls.
pub struct ScriptExecutor<R: ScriptRunner = ProcessSupervisor> {
    config: ExecutionConfig,
    runner: R,
}

impl ScriptExecutor<ProcessSupervisor> {
    /// Executor that runs scripts in real interpreter processes
    pub fn new(config: ExecutionConfig) -> Self {
        Self::with_runner(config, ProcessSupervisor::new())
    }
}

impl<R: ScriptRunner> ScriptExecutor<R> {
    pub fn with_runner(config: ExecutionConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run `request` along the caller-chosen `strategy`
    ///
    /// Tool input is checked against the strategy's schema before anything
    /// else happens; a mismatch never reaches the interpreter.
    pub async fn execute(&self, request: &ExecutionRequest, strategy: &Strategy) -> ExecutionOutcome {
        if let Strategy::Tool {
            schema: Some(schema),
        } = strategy
        {
            let input = JsonValue::Object(request.named_variables.clone());
            validate_tool_input(input, Some(schema))?;
        }

        let settings = ExecutionSettings::resolve(&self.config, request);
        let script = synthesizer_for(strategy).synthesize(request)?;

        info!(
            strategy = %strategy,
            interpreter = %settings.interpreter_path,
            timeout_ms = settings.timeout_ms(),
            "Executing script"
        );

        let stdout = self.runner.run(&script, &settings).await?;
        let decoded = decode_output(&stdout);
        debug!(strategy = %strategy, json = decoded.is_json(), "Decoded script output");

        Ok(decoded.into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecutionError, FailureKind};
    use crate::supervisor::MockScriptRunner;
    use serde_json::json;

    fn query_schema() -> JsonValue {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    #[tokio::test]
    async fn test_schema_failure_never_invokes_interpreter() {
        let mut runner = MockScriptRunner::new();
        runner.expect_run().times(0);

        let executor = ScriptExecutor::with_runner(ExecutionConfig::default(), runner);
        let err = executor
            .execute(
                &ExecutionRequest::new("return query"),
                &Strategy::Tool {
                    schema: Some(query_schema()),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::InputSchema);
        match err {
            ExecutionError::InputSchema { input, .. } => assert_eq!(input, "{}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_valid_tool_input_runs_once() {
        let mut runner = MockScriptRunner::new();
        runner
            .expect_run()
            .times(1)
            .withf(|script, settings| {
                script.stdin_payload.as_deref().is_some_and(|p| p.contains("\"query\":\"rust\""))
                    && settings.interpreter_path == "python"
            })
            .returning(|_, _| Ok("\"RUST\"".to_string()));

        let executor = ScriptExecutor::with_runner(ExecutionConfig::default(), runner);
        let value = executor
            .execute(
                &ExecutionRequest::new("return $query.upper()").with_named_variable("query", json!("rust")),
                &Strategy::Tool {
                    schema: Some(query_schema()),
                },
            )
            .await
            .unwrap();

        assert_eq!(value, json!("RUST"));
    }

    #[tokio::test]
    async fn test_function_node_inlines_payload() {
        let mut runner = MockScriptRunner::new();
        runner
            .expect_run()
            .times(1)
            .withf(|script, _| script.stdin_payload.is_none() && script.source.contains("def __bridge_function():"))
            .returning(|_, _| Ok("3".to_string()));

        let executor = ScriptExecutor::with_runner(ExecutionConfig::default(), runner);
        let request = ExecutionRequest::new("result = a + b")
            .with_named_variable("a", json!(1))
            .with_named_variable("b", json!(2));

        let value = executor.execute(&request, &Strategy::FunctionNode).await.unwrap();
        assert_eq!(value, json!(3));
    }

    #[tokio::test]
    async fn test_request_overrides_reach_runner() {
        let mut runner = MockScriptRunner::new();
        runner
            .expect_run()
            .withf(|_, settings| {
                settings.interpreter_path == "/usr/bin/python3" && settings.timeout_ms() == 1_500
            })
            .returning(|_, _| Ok("hello world".to_string()));

        let executor = ScriptExecutor::with_runner(ExecutionConfig::default(), runner);
        let request = ExecutionRequest::new("print('hello world')")
            .with_interpreter_path("/usr/bin/python3")
            .with_timeout_ms(1_500);

        let value = executor.execute(&request, &Strategy::FunctionNode).await.unwrap();
        assert_eq!(value, json!("hello world"));
    }

    #[tokio::test]
    async fn test_runner_errors_propagate() {
        let mut runner = MockScriptRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Err(ExecutionError::Timeout { timeout_ms: 10 }));

        let executor = ScriptExecutor::with_runner(ExecutionConfig::default(), runner);
        let err = executor
            .execute(&ExecutionRequest::new("while True: pass"), &Strategy::Tool { schema: None })
            .await
            .unwrap_err();

        assert!(err.is_timeout());
    }
}
