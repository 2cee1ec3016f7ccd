use anyhow::{anyhow, Context, Result};
use clap::Parser;
use scriptbridge_config::{BridgeConfig, ConfigLoader, LogLevel};
use scriptbridge_core::{prepare_sandbox_vars, ExecutionRequest, FlowContext, SandboxVariable, Strategy};
use scriptbridge_execution::{parse_input_variables, ExecutionOutcome, ScriptExecutor};
use scriptbridge_logging::{init_logging_from_config, init_simple_tracing};
use serde_json::{from_str, json, Map, Value as JsonValue};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

mod cli;
use cli::{Cli, Commands, ConfigCommands, ScriptArgs};

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&PathBuf>) -> Result<BridgeConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                loader
                    .from_file(path)
                    .context(format!("Failed to load configuration from {:?}", path))
            } else {
                eprintln!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

/// Parse an optional JSON argument, falling back to `default`
fn parse_json_arg(raw: Option<&String>, what: &str, default: JsonValue) -> Result<JsonValue> {
    match raw {
        Some(text) => from_str(text).context(format!("Failed to parse {} JSON", what)),
        None => Ok(default),
    }
}

fn read_code(script: &ScriptArgs) -> Result<String> {
    match (&script.code, &script.code_file) {
        (Some(code), _) => Ok(code.clone()),
        (None, Some(path)) => fs::read_to_string(path)
            .context(format!("Failed to read code file {:?}", path)),
        (None, None) => Err(anyhow!("Either --code or --code-file is required")),
    }
}

/// Build the request fields shared by both commands
fn base_request(script: &ScriptArgs) -> Result<ExecutionRequest> {
    let code = read_code(script)?;

    let variables: Vec<SandboxVariable> = match &script.vars_json {
        Some(text) => from_str(text).context("Failed to parse sandbox variables JSON")?,
        None => Vec::new(),
    };

    let flow: FlowContext = match &script.flow_json {
        Some(text) => from_str(text).context("Failed to parse flow context JSON")?,
        None => FlowContext::default(),
    };

    let mut request = ExecutionRequest::new(code)
        .with_sandbox_variables(prepare_sandbox_vars(&variables))
        .with_flow_context(flow);

    if let Some(interpreter) = &script.interpreter {
        request = request.with_interpreter_path(interpreter.clone());
    }
    if let Some(timeout_ms) = script.timeout_ms {
        request = request.with_timeout_ms(timeout_ms);
    }

    Ok(request)
}

async fn tool_command(
    executor: &ScriptExecutor,
    script: &ScriptArgs,
    input_json: Option<&String>,
    schema_file: Option<&PathBuf>,
) -> CommandResult {
    let input = match parse_json_arg(input_json, "input", json!({}))? {
        JsonValue::Object(map) => map,
        other => return Err(anyhow!("Tool input must be a JSON object, got {}", other)),
    };

    let schema = match schema_file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .context(format!("Failed to read schema file {:?}", path))?;
            Some(from_str::<JsonValue>(&text).context("Failed to parse schema JSON")?)
        }
        None => None,
    };

    let request = base_request(script)?.with_named_variables(input);
    Ok(executor.execute(&request, &Strategy::Tool { schema }).await)
}

async fn function_command(
    executor: &ScriptExecutor,
    script: &ScriptArgs,
    input_variables: Option<&String>,
    input: &str,
) -> CommandResult {
    let raw = input_variables
        .map(|text| JsonValue::String(text.clone()))
        .unwrap_or(JsonValue::Null);
    let variables: Map<String, JsonValue> =
        parse_input_variables(&raw).context("Failed to parse input variables")?;

    let mut request = base_request(script)?.with_named_variables(variables);
    request.flow_context = request.flow_context.with_input(input);

    Ok(executor.execute(&request, &Strategy::FunctionNode).await)
}

/// Argument errors on the outside, the execution outcome inside
type CommandResult = Result<ExecutionOutcome>;

fn print_outcome(outcome: ExecutionOutcome) -> Result<()> {
    match outcome {
        Ok(value) => {
            let rendered = match &value {
                JsonValue::String(text) => text.clone(),
                other => serde_json::to_string_pretty(other)?,
            };
            println!("{}", rendered);
            Ok(())
        }
        Err(e) => {
            warn!(kind = %e.kind(), "Script execution failed");
            Err(anyhow!(e).context("Script execution failed"))
        }
    }
}

fn config_command(config_cmd: &ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Validate { config_file } => {
            let config = ConfigLoader::new()
                .from_file(config_file)
                .context(format!("Failed to load configuration from {:?}", config_file))?;
            println!("Configuration is valid");
            println!(
                "  interpreter: {}\n  timeout: {}ms\n  scratch dir: {}",
                config.execution.interpreter_path,
                config.execution.timeout_ms(),
                config.execution.scratch_dir().display()
            );
            Ok(())
        }
        ConfigCommands::Sample => {
            print!("{}", BridgeConfig::generate_sample());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first; without one, fall back to plain stderr logging
    let mut config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            init_simple_tracing(cli.log_level.as_deref().unwrap_or("info"))?;
            error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    if let Some(level) = &cli.log_level {
        config.logging.level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow!("Invalid --log-level '{}': {}", level, e))?;
    }
    init_logging_from_config(&config.logging)?;

    info!("Scriptbridge CLI starting");
    debug!(interpreter = %config.execution.interpreter_path, "Loaded configuration");

    let executor = ScriptExecutor::new(config.execution.clone());

    match &cli.command {
        Commands::Tool {
            script,
            input_json,
            schema_file,
        } => {
            let outcome = tool_command(&executor, script, input_json.as_ref(), schema_file.as_ref()).await?;
            print_outcome(outcome)
        }
        Commands::Function {
            script,
            input_variables,
            input,
        } => {
            let outcome = function_command(&executor, script, input_variables.as_ref(), input).await?;
            print_outcome(outcome)
        }
        Commands::Config { config_cmd } => config_command(config_cmd),
    }
}
