use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Client for local LLM inference servers
#[derive(Parser, Debug)]
#[command(
    name = "localgen",
    about = "Client for local LLM inference servers",
    version,
    author,
    long_about = "localgen talks to an Ollama-compatible inference server. It generates text \
                  with retries and optional token streaming, and manages model loading and \
                  configuration. The server address comes from OLLAMA_HOST."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(
        short = 'f',
        long,
        global = true,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate text from a prompt",
        long_about = "Sends a prompt to the inference server and prints the response.\n\n\
                      Examples:\n  \
                      localgen generate \"Why is the sky blue?\"\n  \
                      localgen generate -m mistral --temperature 0.2 \"Summarize this\"\n  \
                      localgen generate --stream \"Tell me a story\""
    )]
    Generate(GenerateArgs),

    #[command(about = "Inspect and manage models")]
    Models(ModelsArgs),

    #[command(about = "Check that the inference server is reachable")]
    Health,

    #[command(about = "Show the effective configuration")]
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "PROMPT", help = "Prompt text")]
    pub prompt: String,

    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Model to use (defaults to LOCALGEN_MODEL or llama2)"
    )]
    pub model: Option<String>,

    #[arg(long, value_name = "T", help = "Sampling temperature (0-2)")]
    pub temperature: Option<f64>,

    #[arg(long, value_name = "P", help = "Nucleus sampling threshold (0-1)")]
    pub top_p: Option<f64>,

    #[arg(long, value_name = "TEXT", help = "System prompt override")]
    pub system: Option<String>,

    #[arg(long, help = "Print tokens as they arrive")]
    pub stream: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ModelsCommand {
    #[command(about = "List models known to the server")]
    List,

    #[command(about = "Show a model descriptor")]
    Show(ModelIdArgs),

    #[command(about = "Verify a model against the server and show its status")]
    Status(ModelIdArgs),

    #[command(about = "Load a model, optionally applying a configuration file")]
    Preload(PreloadArgs),

    #[command(about = "Release a loaded model")]
    Unload(ModelIdArgs),

    #[command(about = "Apply a configuration file to a model")]
    Configure(ConfigureArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ModelIdArgs {
    #[arg(value_name = "MODEL")]
    pub model: String,
}

#[derive(Args, Debug, Clone)]
pub struct PreloadArgs {
    #[arg(value_name = "MODEL")]
    pub model: String,

    #[arg(
        long,
        value_name = "FILE",
        help = "Model configuration (JSON or YAML)"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    #[arg(value_name = "MODEL")]
    pub model: String,

    #[arg(
        long,
        value_name = "FILE",
        help = "Model configuration (JSON or YAML)"
    )]
    pub config: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
