//! Core domain models and types for scriptbridge
//!
//! This crate holds the request/context types shared by the script
//! synthesizer and the execution engine, plus JSON schema validation of
//! tool input. It has minimal dependencies and defines the domain language
//! of the bridge.

pub mod error;
pub mod types;
pub mod validation;

// Re-export commonly used types at the crate root
pub use error::{BridgeError, Result, ValidationError};
pub use types::{
    prepare_sandbox_vars, ExecutionRequest, FlowContext, SandboxVariable, SandboxVariableType,
    Strategy,
};
pub use validation::{validate_json, validate_tool_input};
