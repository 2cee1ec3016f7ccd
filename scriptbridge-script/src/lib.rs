//! Script synthesis for scriptbridge
//!
//! This crate turns user code plus an execution context into one
//! self-contained Python script: a preamble that binds the context, the user
//! body, and a postamble that prints exactly one JSON value. Synthesis is a
//! pure function of its inputs; nothing here touches the filesystem or
//! spawns processes.
//!
//! Two strategies exist:
//! - [`ToolScriptSynthesizer`] streams the payload on stdin and rewrites the
//!   user code (`$name` sigils, top-level `return`) before embedding it.
//! - [`FunctionNodeSynthesizer`] inlines the payload into the script and wraps
//!   the user code in a generated function.

pub mod escape;
pub mod function;
pub mod prelude;
pub mod rewrite;
pub mod selection;
pub mod tool;

pub use escape::{escape_triple_quoted, is_identifier, triple_quoted_literal};
pub use function::FunctionNodeSynthesizer;
pub use rewrite::{CodeRewrite, RewritePipeline, SigilRewrite, TopLevelReturnRewrite};
pub use selection::{select_result_source, Bindings, ResultSource, RESULT_PRIORITY};
pub use tool::ToolScriptSynthesizer;

use scriptbridge_core::{ExecutionRequest, Strategy};
use thiserror::Error;

/// Script synthesis errors
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Failed to encode payload: {0}")]
    PayloadEncoding(#[from] serde_json::Error),
}

/// A complete script ready to be handed to the process supervisor
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedScript {
    /// Full source text
    pub source: String,

    /// Bytes to write on the interpreter's stdin; `None` when the payload is
    /// already inlined in `source`
    pub stdin_payload: Option<String>,
}

/// A synthesis strategy
pub trait ScriptSynthesizer: Send + Sync {
    /// Build the script for one call
    fn synthesize(&self, request: &ExecutionRequest) -> Result<SynthesizedScript, SynthesisError>;
}

/// Pick the synthesizer matching a caller-chosen strategy
pub fn synthesizer_for(strategy: &Strategy) -> Box<dyn ScriptSynthesizer> {
    match strategy {
        Strategy::Tool { .. } => Box::new(ToolScriptSynthesizer::new()),
        Strategy::FunctionNode => Box::new(FunctionNodeSynthesizer::new()),
    }
}
