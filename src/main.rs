use mcpdock::cli::commands::{CliArgs, Commands};
use mcpdock::cli::handlers::{handle_detect, handle_dockerfile, handle_run};
use mcpdock::util::logging::{init_logging, parse_level, LoggingConfig};
use mcpdock::VERSION;

use clap::Parser;
use tracing::{debug, warn, Level};

const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("mcpdock v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    // An interrupt drops the running step; a stack operation already
    // submitted keeps going remotely and is rejoined on the next run.
    let exit_code = tokio::select! {
        code = dispatch(&args) => code,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            eprintln!("Interrupted");
            EXIT_INTERRUPTED
        }
    };

    std::process::exit(exit_code);
}

async fn dispatch(args: &CliArgs) -> i32 {
    match &args.command {
        Commands::Run(run_args) => handle_run(run_args).await,
        Commands::Detect(detect_args) => handle_detect(detect_args).await,
        Commands::Dockerfile(dockerfile_args) => handle_dockerfile(dockerfile_args).await,
    }
}

/// CLI flags win over `MCPDOCK_LOG_LEVEL`; `MCPDOCK_LOG_JSON` still applies
fn init_logging_from_args(args: &CliArgs) {
    let mut config = LoggingConfig::from_env();
    if let Some(level) = args.log_level.as_deref() {
        match parse_level(level) {
            Some(level) => config.level = level,
            None => eprintln!("Ignoring unknown log level '{}'", level),
        }
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    init_logging(config);
}
