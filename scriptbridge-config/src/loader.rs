//! Configuration loading and environment variable handling

use crate::domains::BridgeConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Prefix of the environment overrides, e.g. `TOOL_PYTHON_PATH`
pub const DEFAULT_ENV_PREFIX: &str = "TOOL_PYTHON";

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let mut config: BridgeConfig = serde_yaml::from_str(&content)?;

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<BridgeConfig> {
        let mut config = BridgeConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<BridgeConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut BridgeConfig) -> ConfigResult<()> {
        self.apply_execution_overrides(&mut config.execution)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply execution config overrides
    fn apply_execution_overrides(
        &self,
        config: &mut crate::domains::execution::ExecutionConfig,
    ) -> ConfigResult<()> {
        if let Some(path) = self.get_env_var("PATH") {
            config.interpreter_path = path;
        }

        if let Some(timeout) = self.get_env_var("TIMEOUT") {
            let millis: u64 = timeout.trim().parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid {}_TIMEOUT: {}", self.prefix, e))
            })?;
            config.timeout = std::time::Duration::from_millis(millis);
        }

        if let Some(dir) = self.get_env_var("SCRATCH_DIR") {
            config.scratch_dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Some(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level).map_err(|_| {
                ConfigError::EnvError(format!("Invalid {}_LOG_LEVEL: {}", self.prefix, log_level))
            })?;
        }

        if let Some(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format).map_err(|_| {
                ConfigError::EnvError(format!("Invalid {}_LOG_FORMAT: {}", self.prefix, format))
            })?;
        }

        Ok(())
    }

    /// Get environment variable with prefix. Empty values count as unset.
    fn get_env_var(&self, name: &str) -> Option<String> {
        std::env::var(format!("{}_{}", self.prefix, name))
            .ok()
            .filter(|value| !value.is_empty())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
