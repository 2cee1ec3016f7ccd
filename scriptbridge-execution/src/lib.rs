//! Scriptbridge Execution Engine
//!
//! This crate runs synthesized scripts in a child interpreter process and
//! turns what they print into a value. Every call gets its own temporary
//! script file and its own process; nothing is shared between calls except
//! the read-only configuration.
//!
//! - [`ProcessSupervisor`] writes the script, spawns the interpreter, drains
//!   its streams, enforces the deadline and cleans up.
//! - [`decode_output`] turns stdout into JSON or, failing that, plain text.
//! - [`ScriptExecutor`] is the caller-facing facade: validate, synthesize,
//!   run, decode.
//! - [`DynamicScriptTool`] and [`FunctionNodeExecutor`] wrap the facade for
//!   the two call shapes.

pub mod artifact;
pub mod decode;
pub mod error;
pub mod executor;
pub mod function;
pub mod settings;
pub mod supervisor;
pub mod tool;

// Re-export main types
pub use artifact::ScriptArtifact;
pub use decode::{decode_output, DecodedOutput};
pub use error::{ExecutionError, ExecutionOutcome, FailureKind};
pub use executor::ScriptExecutor;
pub use function::{parse_input_variables, FunctionNodeExecutor};
pub use settings::ExecutionSettings;
pub use supervisor::{ProcessSupervisor, ScriptRunner};
pub use tool::DynamicScriptTool;
