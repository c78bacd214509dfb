use super::commands::{GenerateArgs, ModelsArgs, ModelsCommand};
use super::output::{HealthStatus, OutputFormat, OutputFormatter};
use crate::client::GenerativeClient;
use crate::config::ClientConfig;
use crate::generation::{GenerateRequest, HandlerError, StreamHandler};
use crate::logger::TracingLogger;
use crate::registry::ModelConfigOptions;
use crate::validator::{validate_model_config, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

/// Writes streamed tokens straight to stdout
struct StdoutTokenHandler;

#[async_trait]
impl StreamHandler for StdoutTokenHandler {
    async fn on_token(&self, token: &str) -> std::result::Result<(), HandlerError> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(token.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn build_client(config: &ClientConfig) -> Result<GenerativeClient> {
    GenerativeClient::from_config(config, Arc::new(TracingLogger))
        .context("Failed to initialize client")
}

/// Reads a model configuration file, JSON or YAML by extension
pub fn load_model_config(path: &Path) -> Result<ModelConfigOptions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );

    let raw: Value = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    };

    let config = validate_model_config(&raw)
        .with_context(|| format!("Invalid model configuration in {}", path.display()))?;
    Ok(config)
}

pub async fn handle_generate(
    args: &GenerateArgs,
    config: &ClientConfig,
    format: OutputFormat,
) -> i32 {
    exit_code(run_generate(args, config, format).await)
}

async fn run_generate(
    args: &GenerateArgs,
    config: &ClientConfig,
    format: OutputFormat,
) -> Result<()> {
    let client = build_client(config)?;

    let mut request = GenerateRequest::new(args.prompt.clone())
        .with_temperature(args.temperature.unwrap_or(DEFAULT_TEMPERATURE))
        .with_top_p(args.top_p.unwrap_or(DEFAULT_TOP_P))
        .with_stream(args.stream);
    if let Some(model) = &args.model {
        request = request.with_model(model.clone());
    }
    if let Some(system) = &args.system {
        request = request.with_system(system.clone());
    }

    // Structured formats need the whole result, so only human output streams
    let stdout_handler = StdoutTokenHandler;
    let handler: Option<&dyn StreamHandler> = match format {
        OutputFormat::Human if args.stream => Some(&stdout_handler),
        _ => None,
    };

    let result = client
        .generate_detailed(&request, handler)
        .await
        .context("Generation failed")?;

    if handler.is_some() {
        println!();
    } else {
        print!("{}", OutputFormatter::new(format).format_result(&result)?);
    }
    Ok(())
}

pub async fn handle_models(args: &ModelsArgs, config: &ClientConfig, format: OutputFormat) -> i32 {
    exit_code(run_models(args, config, format).await)
}

async fn run_models(args: &ModelsArgs, config: &ClientConfig, format: OutputFormat) -> Result<()> {
    let client = build_client(config)?;
    let output = execute_models_command(&client, &args.command, &OutputFormatter::new(format)).await?;
    print!("{}", output);
    Ok(())
}

/// Runs one `models` subcommand and renders its outcome
///
/// Each CLI run starts with an empty registry, so lifecycle commands refresh
/// the model's status from the server before deciding what to do.
pub async fn execute_models_command(
    client: &GenerativeClient,
    command: &ModelsCommand,
    formatter: &OutputFormatter,
) -> Result<String> {
    match command {
        ModelsCommand::List => {
            let models = client.list_models().await.context("Failed to list models")?;
            formatter.format_models(&models)
        }
        ModelsCommand::Show(id) => {
            let model = client
                .get_model(&id.model)
                .await?
                .with_context(|| format!("Model {} not found", id.model))?;
            formatter.format_model(&model)
        }
        ModelsCommand::Status(id) => {
            let status = client.get_model_status(&id.model).await?;
            formatter.format_status(&id.model, &status)
        }
        ModelsCommand::Preload(preload) => {
            let model_config = preload
                .config
                .as_deref()
                .map(load_model_config)
                .transpose()?;
            client.get_model_status(&preload.model).await?;
            client
                .preload_model(&preload.model, model_config)
                .await
                .with_context(|| format!("Failed to preload {}", preload.model))?;
            let status = client.models().registry().status(&preload.model).await;
            formatter.format_status(&preload.model, &status)
        }
        ModelsCommand::Unload(id) => {
            client.get_model_status(&id.model).await?;
            client
                .unload_model(&id.model)
                .await
                .with_context(|| format!("Failed to unload {}", id.model))?;
            let status = client.models().registry().status(&id.model).await;
            formatter.format_status(&id.model, &status)
        }
        ModelsCommand::Configure(configure) => {
            let model_config = load_model_config(&configure.config)?;
            client
                .update_model_config(&configure.model, model_config)
                .await
                .with_context(|| format!("Failed to configure {}", configure.model))?;
            let model = client
                .get_model(&configure.model)
                .await?
                .with_context(|| format!("Model {} not found", configure.model))?;
            formatter.format_model(&model)
        }
    }
}

pub async fn handle_health(config: &ClientConfig, format: OutputFormat) -> i32 {
    let formatter = OutputFormatter::new(format);

    let health = match config.create_backend() {
        Ok(backend) => match backend.health_check().await {
            Ok(true) => HealthStatus::available("Ollama", "Server is reachable"),
            Ok(false) => HealthStatus::unavailable("Ollama", "Server is not reachable")
                .with_details(config.host.clone()),
            Err(e) => HealthStatus::unavailable("Ollama", e.to_string())
                .with_details(config.host.clone()),
        },
        Err(e) => HealthStatus::unavailable("Ollama", e.to_string()),
    };
    debug!("Health: {:?}", health);

    match formatter.format_health(&health) {
        Ok(output) => {
            print!("{}", output);
            if health.available {
                0
            } else {
                1
            }
        }
        Err(e) => exit_code(Err(e)),
    }
}

pub fn handle_config(config: &ClientConfig, format: OutputFormat) -> i32 {
    exit_code(
        OutputFormatter::new(format)
            .format_config(config)
            .map(|output| print!("{}", output)),
    )
}
