//! Output formatting for multiple formats
//!
//! Every printable value renders as JSON, YAML or human-readable text.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::ClientConfig;
use crate::generation::GenerateResult;
use crate::registry::{ModelDescriptor, ModelStatus};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Renders CLI results in the selected format
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn format_result(&self, result: &GenerateResult) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_result_human(result)),
            _ => self.serialize(result, "generation result"),
        }
    }

    pub fn format_models(&self, models: &[ModelDescriptor]) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_models_human(models)),
            _ => self.serialize(models, "model list"),
        }
    }

    pub fn format_model(&self, model: &ModelDescriptor) -> Result<String> {
        match self.format {
            OutputFormat::Human => self.format_model_human(model),
            _ => self.serialize(model, "model descriptor"),
        }
    }

    pub fn format_status(&self, id: &str, status: &ModelStatus) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_status_human(id, status)),
            _ => self.serialize(
                &serde_json::json!({ "model": id, "status": status }),
                "model status",
            ),
        }
    }

    pub fn format_config(&self, config: &ClientConfig) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_config_human(config)),
            _ => self.serialize(&config.to_display_map(), "config"),
        }
    }

    pub fn format_health(&self, health: &HealthStatus) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_health_human(health)),
            _ => self.serialize(health, "health status"),
        }
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            _ => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
        }
    }

    // Human-readable formatting methods

    fn format_result_human(&self, result: &GenerateResult) -> String {
        let mut output = String::new();
        output.push_str(&result.text);
        if !result.text.ends_with('\n') {
            output.push('\n');
        }

        let mut stats = Vec::new();
        if let Some(tokens) = result.total_token_count {
            stats.push(format!("{} tokens", tokens));
        }
        if let Some(ms) = result.total_duration_ms {
            stats.push(format!("{}ms", ms));
        }
        if !stats.is_empty() {
            output.push_str(&format!("\n({})\n", stats.join(", ")));
        }

        output
    }

    fn format_models_human(&self, models: &[ModelDescriptor]) -> String {
        let mut output = String::new();
        output.push_str("Models\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        if models.is_empty() {
            output.push_str("(no models found)\n");
            return output;
        }

        for model in models {
            output.push_str(&format!(
                "\u{2022} {}  (context {}, {})\n",
                model.name, model.capabilities.max_context_length, model.provider
            ));
        }
        output
    }

    fn format_model_human(&self, model: &ModelDescriptor) -> Result<String> {
        let caps = &model.capabilities;
        let mut output = String::new();

        output.push_str(&format!("Model: {}\n", model.name));
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!("Provider:        {}\n", model.provider));
        output.push_str(&format!("Max Context:     {}\n", caps.max_context_length));
        output.push_str(&format!("Streaming:       {}\n", caps.supports_streaming));
        output.push_str(&format!("System Prompt:   {}\n", caps.supports_system_prompt));
        output.push_str(&format!(
            "Temperature:     {} ({}-{})\n",
            caps.temperature.default, caps.temperature.min, caps.temperature.max
        ));
        output.push_str(&format!(
            "Top P:           {} ({}-{})\n",
            caps.top_p.default, caps.top_p.min, caps.top_p.max
        ));

        if let Some(config) = &model.custom_config {
            let rendered = serde_json::to_string(config)
                .context("Failed to serialize model configuration")?;
            output.push_str(&format!("Custom Config:   {}\n", rendered));
        }

        Ok(output)
    }

    fn format_status_human(&self, id: &str, status: &ModelStatus) -> String {
        let symbol = if status.is_error() {
            "\u{2717}"
        } else {
            "\u{2713}"
        };

        let mut output = format!("{} {}\n", symbol, id);
        output.push_str(&format!("  Status: {}\n", status.status));
        output.push_str(&format!("  Loaded: {}\n", status.loaded));
        if let Some(error) = &status.error {
            output.push_str(&format!("  Error: {}\n", error));
        }
        if let Some(last_used) = &status.last_used {
            output.push_str(&format!("  Last Used: {}\n", last_used.to_rfc3339()));
        }
        output
    }

    fn format_config_human(&self, config: &ClientConfig) -> String {
        let mut output = String::new();
        output.push_str("localgen Configuration\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str("Server:\n");
        output.push_str(&format!("  Host: {}\n", config.host));
        output.push_str(&format!("  Timeout: {}s\n", config.request_timeout_secs));

        output.push_str("\nGeneration:\n");
        output.push_str(&format!("  Default Model: {}\n", config.default_model));
        output.push_str(&format!("  Max Retries: {}\n", config.max_retries));
        output.push_str(&format!("  Retry Delay: {}ms\n", config.retry_delay_ms));

        output.push_str("\nLogging:\n");
        output.push_str(&format!("  Level: {}\n", config.log_level));
        output
    }

    fn format_health_human(&self, health: &HealthStatus) -> String {
        let symbol = if health.available {
            "\u{2713}"
        } else {
            "\u{2717}"
        };

        let mut output = format!("{} {}\n", symbol, health.backend);
        output.push_str(&format!(
            "  Status: {}\n",
            if health.available {
                "Available"
            } else {
                "Unavailable"
            }
        ));
        output.push_str(&format!("  Message: {}\n", health.message));
        if let Some(details) = &health.details {
            output.push_str(&format!("  Details: {}\n", details));
        }
        output
    }
}

/// Health of the inference server
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthStatus {
    /// Backend name
    pub backend: String,
    /// Whether the server answered
    pub available: bool,
    pub message: String,
    pub details: Option<String>,
}

impl HealthStatus {
    pub fn available(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            available: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            available: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
