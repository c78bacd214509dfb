//! Structured logging setup for localgen
//!
//! Initializes the `tracing` subscriber used by the binary and by
//! [`crate::TracingLogger`]. Output goes to stderr so generated text on
//! stdout stays clean.
//!
//! # Example
//!
//! ```no_run
//! use localgen::util::logging;
//!
//! // With environment: LOCALGEN_LOG_LEVEL=debug
//! logging::init_from_env();
//!
//! tracing::info!("Application started");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., localgen::generation) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    /// INFO level, plain console output, targets shown, no locations
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with source locations
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
        }
    }
}

/// Parses a log level, case-insensitively
///
/// Unknown values fall back to `Level::INFO`.
///
/// ```
/// use localgen::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn directives(level: Level) -> Vec<Directive> {
    let mut specs = vec![format!("localgen={}", level)];

    // Quiet the HTTP stack unless RUST_LOG asks otherwise
    if env::var("RUST_LOG").is_err() {
        specs.extend(["h2=warn", "hyper=warn", "reqwest=warn"].map(String::from));
    }

    specs.iter().filter_map(|spec| spec.parse().ok()).collect()
}

/// Initializes the logging system; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = directives(config.level)
            .into_iter()
            .fold(EnvFilter::from_default_env(), |filter, directive| {
                filter.add_directive(directive)
            });

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Initializes logging from `LOCALGEN_LOG_LEVEL` and `LOCALGEN_LOG_JSON`
///
/// `RUST_LOG` directives are honored on top.
pub fn init_from_env() {
    let level_str = env::var("LOCALGEN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let use_json = env::var("LOCALGEN_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level: parse_level(&level_str),
        use_json,
        ..Default::default()
    });
}

/// Initializes logging with a level given as a string
pub fn with_level(level_str: &str) {
    init_logging(LoggingConfig::with_level(parse_level(level_str)));
}
