//! Domain-driven configuration management for scriptbridge
//!
//! Configuration is split by functional domain (execution, logging), with
//! validation, defaults, and environment variable overrides. It is resolved
//! once and passed down; nothing below the loader reads the environment.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    execution::ExecutionConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    BridgeConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration_ms;
