use localgen::cli::commands::{CliArgs, Commands};
use localgen::cli::handlers::{handle_config, handle_generate, handle_health, handle_models};
use localgen::cli::OutputFormat;
use localgen::util::logging::{init_logging, parse_level, LoggingConfig};
use localgen::{ClientConfig, VERSION};

use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("localgen v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let mut config = ClientConfig::default();
    if let Some(level) = &args.log_level {
        config.log_level = level.to_lowercase();
    }
    let format = OutputFormat::from(args.format);

    let exit_code = match &args.command {
        Commands::Generate(generate_args) => handle_generate(generate_args, &config, format).await,
        Commands::Models(models_args) => handle_models(models_args, &config, format).await,
        Commands::Health => handle_health(&config, format).await,
        Commands::Config => handle_config(&config, format),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("LOCALGEN_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        parse_level(&level_str)
    };

    let use_json = env::var("LOCALGEN_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}
