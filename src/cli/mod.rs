pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, DetectArgs, DockerfileArgs, RunArgs};
pub use output::{OutputFormat, OutputFormatter};
