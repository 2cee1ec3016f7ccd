//! Per-call execution settings

use scriptbridge_config::ExecutionConfig;
use scriptbridge_core::ExecutionRequest;
use std::path::PathBuf;
use std::time::Duration;

/// Settings of one call, resolved once from configuration plus the
/// request's own overrides. The supervisor reads nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSettings {
    pub interpreter_path: String,
    pub timeout: Duration,
    pub scratch_dir: PathBuf,
    pub script_prefix: String,
}

impl ExecutionSettings {
    pub fn resolve(config: &ExecutionConfig, request: &ExecutionRequest) -> Self {
        let interpreter_path = request
            .interpreter_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .unwrap_or(&config.interpreter_path)
            .to_string();

        let timeout = request
            .timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(config.timeout);

        Self {
            interpreter_path,
            timeout,
            scratch_dir: config.scratch_dir(),
            script_prefix: config.script_prefix.clone(),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

impl From<&ExecutionConfig> for ExecutionSettings {
    fn from(config: &ExecutionConfig) -> Self {
        Self::resolve(config, &ExecutionRequest::default())
    }
}
