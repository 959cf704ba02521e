use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Deploy stdio MCP servers as HTTP services
#[derive(Parser, Debug)]
#[command(
    name = "mcpdock",
    about = "Package stdio MCP servers behind an HTTP proxy and deploy them",
    version,
    long_about = "mcpdock fetches an MCP server repository, detects how the server is \
                  launched, builds a container that wraps it in an HTTP proxy, and \
                  optionally pushes and deploys it to ECS behind a load balancer."
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
        help = "Quiet mode - only errors are logged"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build, push and deploy from a configuration file",
        long_about = "Runs the full pipeline described by a YAML configuration file: fetch \
                      the repository, detect the launch command, build the image, and push \
                      and deploy it when enabled.\n\n\
                      Examples:\n  \
                      mcpdock run --config weather.yaml\n  \
                      mcpdock run -c weather.yaml --format json"
    )]
    Run(RunArgs),

    #[command(
        about = "Detect the launch command of a local checkout",
        long_about = "Inspects a local repository and prints the launch-command candidates, \
                      the package manager and the resulting proxy command.\n\n\
                      Examples:\n  \
                      mcpdock detect\n  \
                      mcpdock detect ./weather-mcp --format json\n  \
                      mcpdock detect ./weather-mcp -- python -m weather"
    )]
    Detect(DetectArgs),

    #[command(
        about = "Print the Dockerfile for a local checkout",
        long_about = "Renders the Dockerfile that would be built for a local repository.\n\n\
                      Examples:\n  \
                      mcpdock dockerfile ./weather-mcp\n  \
                      mcpdock dockerfile ./weather-mcp --env API_BASE=https://api.example.com"
    )]
    Dockerfile(DockerfileArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(short = 'c', long, value_name = "FILE", help = "YAML configuration file")]
    pub config: PathBuf,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(value_name = "PATH", help = "Path to repository (defaults to current directory)")]
    pub repository_path: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,

    #[arg(long, default_value = "8000", help = "Port the HTTP proxy listens on")]
    pub port: u16,

    #[arg(long, help = "Run the proxy with debug logging")]
    pub proxy_debug: bool,

    #[arg(
        last = true,
        value_name = "COMMAND",
        help = "Launch command to use instead of detection"
    )]
    pub command_override: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DockerfileArgs {
    #[arg(value_name = "PATH", help = "Path to repository (defaults to current directory)")]
    pub repository_path: Option<PathBuf>,

    #[arg(long, default_value = "8000", help = "Port the HTTP proxy listens on")]
    pub port: u16,

    #[arg(long, help = "Run the proxy with debug logging")]
    pub proxy_debug: bool,

    #[arg(
        short = 'e',
        long = "env",
        value_name = "KEY=VALUE",
        value_parser = parse_env_var,
        help = "Environment variable baked into the image (repeatable)"
    )]
    pub env: Vec<(String, String)>,

    #[arg(short = 'o', long, value_name = "FILE", help = "Write the Dockerfile to a file")]
    pub output: Option<PathBuf>,

    #[arg(
        last = true,
        value_name = "COMMAND",
        help = "Launch command to use instead of detection"
    )]
    pub command_override: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_env_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid environment variable '{}'. Expected KEY=VALUE", s)),
    }
}

/// Trailing `-- COMMAND...` tokens, when any were given
pub fn override_tokens(tokens: &[String]) -> Option<&[String]> {
    (!tokens.is_empty()).then_some(tokens)
}
