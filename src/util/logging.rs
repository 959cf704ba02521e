//! Logging setup on `tracing`
//!
//! Logs go to stderr so stdout stays clean for the JSON and Dockerfile
//! output of the CLI. `MCPDOCK_LOG_LEVEL` and `MCPDOCK_LOG_JSON` pick the
//! defaults; `RUST_LOG` directives still apply on top.
//!
//! ```no_run
//! mcpdock::util::logging::init_from_env();
//! tracing::info!(stack = "mcp-server-weather", "Deploying");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LEVEL_ENV: &str = "MCPDOCK_LOG_LEVEL";
pub const JSON_ENV: &str = "MCPDOCK_LOG_JSON";

static INIT: Once = Once::new();

/// HTTP and Docker client internals, held at `warn` unless `RUST_LOG` is set
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "bollard"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level for mcpdock's own events
    pub level: Level,
    /// JSON lines, one per event
    pub json: bool,
    /// Source file and line on every event
    pub with_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            with_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Reads the `MCPDOCK_LOG_*` variables; anything unset or unparseable
    /// keeps its default.
    pub fn from_env() -> Self {
        let level = env::var(LEVEL_ENV)
            .ok()
            .and_then(|v| parse_level(&v))
            .unwrap_or(Level::INFO);
        let json = env::var(JSON_ENV).is_ok_and(|v| is_truthy(&v));
        Self {
            level,
            json,
            // Machine-read logs carry locations
            with_location: json,
        }
    }
}

/// Case-insensitive level name
///
/// ```
/// use mcpdock::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("Debug"), Some(Level::DEBUG));
/// assert_eq!(parse_level("loud"), None);
/// ```
pub fn parse_level(name: &str) -> Option<Level> {
    name.trim().parse::<Level>().ok()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn filter_for(level: Level) -> EnvFilter {
    let user_set = env::var_os("RUST_LOG").is_some();
    let mut directives = vec![format!("mcpdock={}", level)];
    if !user_set {
        directives.extend(QUIET_TARGETS.iter().map(|t| format!("{}=warn", t)));
    }

    directives
        .iter()
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(EnvFilter::from_default_env(), EnvFilter::add_directive)
}

/// Installs the global subscriber once; later calls are no-ops
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(config.with_location)
            .with_line_number(config.with_location);
        let layer = if config.json {
            base.json().boxed()
        } else {
            base.boxed()
        };

        // Another subscriber may already be installed, e.g. by a test harness
        let _ = tracing_subscriber::registry()
            .with(filter_for(config.level))
            .with(layer)
            .try_init();
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

pub fn init_from_env() {
    init_logging(LoggingConfig::from_env());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use yare::parameterized;

    #[parameterized(
        lower = { "trace", Some(Level::TRACE) },
        mixed = { "Warn", Some(Level::WARN) },
        padded = { " error ", Some(Level::ERROR) },
        unknown = { "verbose", None },
        empty = { "", None },
    )]
    fn test_parse_level(name: &str, expected: Option<Level>) {
        assert_eq!(parse_level(name), expected);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var(LEVEL_ENV, "debug");
        env::set_var(JSON_ENV, "yes");
        let config = LoggingConfig::from_env();
        env::remove_var(LEVEL_ENV);
        env::remove_var(JSON_ENV);

        assert_eq!(config.level, Level::DEBUG);
        assert!(config.json);
        assert!(config.with_location);
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_garbage() {
        env::set_var(LEVEL_ENV, "chatty");
        env::set_var(JSON_ENV, "maybe");
        let config = LoggingConfig::from_env();
        env::remove_var(LEVEL_ENV);
        env::remove_var(JSON_ENV);

        assert_eq!(config, LoggingConfig::default());
    }
}
