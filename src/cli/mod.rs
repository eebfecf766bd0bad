pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ExtractArgs, RunArgs};
pub use output::{OutputFormat, OutputFormatter};
