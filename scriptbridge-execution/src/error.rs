//! Error types for script execution

use scriptbridge_config::ConfigError;
use scriptbridge_core::{BridgeError, ValidationError};
use scriptbridge_script::SynthesisError;
use serde_json::Value as JsonValue;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result of one call: the decoded value or the reason there is none
pub type ExecutionOutcome = Result<JsonValue, ExecutionError>;

/// Script execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Tool input failed schema validation; no process was started
    #[error("Input did not match expected schema: {message}")]
    InputSchema { message: String, input: String },

    #[error("Failed to write temporary script in {}: {source}", path.display())]
    ScriptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start interpreter '{interpreter}': {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Script execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Non-zero exit. `stderr` holds the error stream, or stdout when the
    /// error stream was empty.
    #[error("Script failed ({status}): {stderr}")]
    Runtime {
        code: Option<i32>,
        status: String,
        stderr: String,
    },

    #[error("Invalid input variables: {0}")]
    InvalidInputVariables(String),

    #[error("Script synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Process error: {0}")]
    Process(String),
}

/// Classification of an [`ExecutionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InputSchema,
    ScriptWrite,
    Spawn,
    Timeout,
    Runtime,
    InvalidInput,
    Synthesis,
    Validation,
    Configuration,
    Process,
}

impl ExecutionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecutionError::InputSchema { .. } => FailureKind::InputSchema,
            ExecutionError::ScriptWrite { .. } => FailureKind::ScriptWrite,
            ExecutionError::Spawn { .. } => FailureKind::Spawn,
            ExecutionError::Timeout { .. } => FailureKind::Timeout,
            ExecutionError::Runtime { .. } => FailureKind::Runtime,
            ExecutionError::InvalidInputVariables(_) => FailureKind::InvalidInput,
            ExecutionError::Synthesis(_) => FailureKind::Synthesis,
            ExecutionError::Validation(_) => FailureKind::Validation,
            ExecutionError::Configuration(_) => FailureKind::Configuration,
            ExecutionError::Process(_) => FailureKind::Process,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InputSchema => "input_schema",
            FailureKind::ScriptWrite => "script_write",
            FailureKind::Spawn => "spawn",
            FailureKind::Timeout => "timeout",
            FailureKind::Runtime => "runtime",
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::Synthesis => "synthesis",
            FailureKind::Validation => "validation",
            FailureKind::Configuration => "configuration",
            FailureKind::Process => "process",
        };
        f.write_str(name)
    }
}

// Convert from core errors
impl From<BridgeError> for ExecutionError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Validation(ValidationError::SchemaMismatch { message, input }) => {
                Self::InputSchema { message, input }
            }
            other => Self::Validation(other.to_string()),
        }
    }
}

// Convert from config errors
impl From<ConfigError> for ExecutionError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
