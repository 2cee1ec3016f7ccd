//! Core error types for scriptbridge

use thiserror::Error;

/// Core error type shared by the bridge crates
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for the core crate
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The declared schema itself could not be compiled
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Input did not satisfy the schema. `input` keeps the offending value
    /// serialized so it can be reported back to whoever produced it.
    #[error("Input did not match expected schema: {message}")]
    SchemaMismatch { message: String, input: String },
}
