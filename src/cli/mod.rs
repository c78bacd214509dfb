pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, GenerateArgs, ModelsArgs, ModelsCommand};
pub use output::{HealthStatus, OutputFormat, OutputFormatter};
