//! CLI argument parsing definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run user code as a schema-validated tool call
    Tool {
        #[command(flatten)]
        script: ScriptArgs,

        /// JSON object passed as the tool input (example: --input-json='{"query":"rust"}')
        #[arg(long, value_name = "JSON")]
        input_json: Option<String>,

        /// JSON schema the input must satisfy
        #[arg(long, value_name = "PATH")]
        schema_file: Option<PathBuf>,
    },

    /// Run user code as a pipeline function node
    Function {
        #[command(flatten)]
        script: ScriptArgs,

        /// Input variables as a JSON object (example: --input-variables='{"a":1,"b":2}')
        #[arg(long, value_name = "JSON")]
        input_variables: Option<String>,

        /// Pipeline input exposed as `input_text`
        #[arg(long, value_name = "TEXT", default_value = "")]
        input: String,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

/// Arguments shared by the execution commands
#[derive(Args)]
pub struct ScriptArgs {
    /// User code to run
    #[arg(long, value_name = "CODE", conflicts_with = "code_file", required_unless_present = "code_file")]
    pub code: Option<String>,

    /// File containing the user code
    #[arg(long, value_name = "PATH")]
    pub code_file: Option<PathBuf>,

    /// Sandbox variables as a JSON array of {"name", "value", "type"} objects
    #[arg(long, value_name = "JSON")]
    pub vars_json: Option<String>,

    /// Flow context as a JSON object (example: --flow-json='{"sessionId":"abc"}')
    #[arg(long, value_name = "JSON")]
    pub flow_json: Option<String>,

    /// Interpreter for this call, overriding configuration
    #[arg(long, value_name = "PATH")]
    pub interpreter: Option<String>,

    /// Timeout for this call in milliseconds, overriding configuration
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Print a sample configuration file
    Sample,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_command() {
        let cli = Cli::try_parse_from([
            "scriptbridge",
            "--log-level",
            "debug",
            "tool",
            "--code",
            "return $query",
            "--input-json",
            r#"{"query":"rust"}"#,
            "--timeout-ms",
            "500",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Tool {
                script, input_json, ..
            } => {
                assert_eq!(script.code.as_deref(), Some("return $query"));
                assert_eq!(script.timeout_ms, Some(500));
                assert_eq!(input_json.as_deref(), Some(r#"{"query":"rust"}"#));
            }
            _ => panic!("expected tool command"),
        }
    }

    #[test]
    fn test_function_command_defaults() {
        let cli = Cli::try_parse_from(["scriptbridge", "function", "--code-file", "node.py"]).unwrap();

        match cli.command {
            Commands::Function {
                script,
                input_variables,
                input,
            } => {
                assert_eq!(script.code_file, Some(PathBuf::from("node.py")));
                assert!(input_variables.is_none());
                assert_eq!(input, "");
            }
            _ => panic!("expected function command"),
        }
    }

    #[test]
    fn test_code_is_required() {
        assert!(Cli::try_parse_from(["scriptbridge", "tool"]).is_err());
        assert!(Cli::try_parse_from([
            "scriptbridge",
            "tool",
            "--code",
            "x",
            "--code-file",
            "y.py"
        ])
        .is_err());
    }

    #[test]
    fn test_config_commands() {
        let cli = Cli::try_parse_from(["scriptbridge", "--config", "bridge.yaml", "config", "sample"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("bridge.yaml")));
        assert!(matches!(
            cli.command,
            Commands::Config {
                config_cmd: ConfigCommands::Sample
            }
        ));
    }
}
