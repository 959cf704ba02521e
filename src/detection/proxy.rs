//! Protocol proxy invocation

use serde::{Deserialize, Serialize};

pub const PROXY_BINARY: &str = "mcp-proxy";
pub const DEFAULT_PROXY_PORT: u16 = 8000;

/// Settings that shape the proxy wrapper, independent of the wrapped command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyOptions {
    pub port: u16,
    pub debug: bool,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROXY_PORT,
            debug: false,
        }
    }
}

impl ProxyOptions {
    pub fn new(port: u16, debug: bool) -> Self {
        Self { port, debug }
    }
}

/// Proxy argv wrapping `command args...`.
///
/// `--` separates proxy flags from the wrapped arguments and appears exactly
/// when there is at least one argument.
pub fn proxy_argv(command: &str, args: &[String], options: ProxyOptions) -> Vec<String> {
    let mut argv = Vec::with_capacity(args.len() + 7);
    argv.push(PROXY_BINARY.to_string());
    if options.debug {
        argv.push("--debug".to_string());
    }
    argv.push("--port".to_string());
    argv.push(options.port.to_string());
    argv.push("--shell".to_string());
    argv.push(command.to_string());
    if !args.is_empty() {
        argv.push("--".to_string());
        argv.extend(args.iter().cloned());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ProxyOptions::default();
        assert_eq!(options.port, 8000);
        assert!(!options.debug);
    }

    #[test]
    fn test_argv_without_args() {
        let argv = proxy_argv("weather-server", &[], ProxyOptions::default());
        assert_eq!(
            argv,
            vec!["mcp-proxy", "--port", "8000", "--shell", "weather-server"]
        );
    }

    #[test]
    fn test_argv_with_debug_and_args() {
        let argv = proxy_argv(
            "npx",
            &["-y".to_string(), "@acme/server".to_string()],
            ProxyOptions::new(9000, true),
        );
        assert_eq!(
            argv,
            vec![
                "mcp-proxy",
                "--debug",
                "--port",
                "9000",
                "--shell",
                "npx",
                "--",
                "-y",
                "@acme/server"
            ]
        );
    }
}
