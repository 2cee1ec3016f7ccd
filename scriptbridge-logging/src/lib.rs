//! Structured logging initialisation for scriptbridge
//!
//! The bridge crates log through `tracing`; this crate installs the global
//! subscriber the way the configuration asks for it.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
pub use scriptbridge_config::{LogFormat, LogLevel, LoggingConfig};
