//! Script execution configuration

use crate::error::ConfigResult;
use crate::validation::{
    validate_file_name_fragment, validate_positive, validate_required_string, Validatable,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Interpreter used when nothing else is configured
pub const DEFAULT_INTERPRETER: &str = "python";

/// Wall-clock budget of one script run when nothing else is configured
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Script execution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Path or executable name of the external interpreter
    #[serde(default = "default_interpreter_path")]
    pub interpreter_path: String,

    /// Maximum lifetime of one interpreter process, in milliseconds
    #[serde(with = "crate::domains::utils::serde_duration_ms", default = "default_timeout")]
    pub timeout: Duration,

    /// Directory for temporary scripts; the OS temp dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// File name prefix of temporary scripts
    #[serde(default = "default_script_prefix")]
    pub script_prefix: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            interpreter_path: default_interpreter_path(),
            timeout: default_timeout(),
            scratch_dir: None,
            script_prefix: default_script_prefix(),
        }
    }
}

impl ExecutionConfig {
    /// Directory temporary scripts are written to
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

impl Validatable for ExecutionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.interpreter_path, "interpreter_path", self.domain_name())?;
        validate_positive(self.timeout_ms(), "timeout", self.domain_name())?;
        validate_file_name_fragment(&self.script_prefix, "script_prefix", self.domain_name())?;

        if let Some(dir) = &self.scratch_dir {
            if dir.as_os_str().is_empty() {
                return Err(self.validation_error("scratch_dir cannot be empty when set"));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "execution"
    }
}

// Default value functions
fn default_interpreter_path() -> String {
    DEFAULT_INTERPRETER.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_millis(DEFAULT_TIMEOUT_MS)
}

fn default_script_prefix() -> String {
    "scriptbridge".to_string()
}
