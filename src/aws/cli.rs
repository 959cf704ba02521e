//! Runs the `aws` command-line client
//!
//! Arguments are passed as a structured argv, never through a shell. The
//! region and profile of the [`AwsContext`] are appended to every call.

use super::context::AwsContext;
use regex::Regex;
use serde_json::Value;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace};

const DEFAULT_BINARY: &str = "aws";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Service error codes that mean "try again later"
const TRANSIENT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "ServiceUnavailable",
    "InternalFailure",
    "InternalError",
    "RequestExpired",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AwsCliError {
    #[error("failed to run '{binary}': {message}")]
    Spawn { binary: String, message: String },

    #[error("{operation} rejected ({code}): {message}")]
    Rejected {
        code: String,
        operation: String,
        message: String,
    },

    #[error("could not reach AWS endpoint: {0}")]
    Connection(String),

    #[error("aws exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },

    #[error("aws did not finish within {0}s")]
    Timeout(u64),

    #[error("unexpected aws output: {0}")]
    InvalidOutput(String),
}

impl AwsCliError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rejected { code, .. } => TRANSIENT_CODES.contains(&code.as_str()),
            Self::Connection(_) | Self::Timeout(_) => true,
            _ => false,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}

fn service_error_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)An error occurred \(([^)]+)\) when calling the (\w+) operation(?: \([^)]*\))?: (.*)",
        )
        .expect("service error regex is valid")
    })
}

/// Turns the stderr of a failed invocation into a structured error
pub fn parse_failure(status: i32, stderr: &str) -> AwsCliError {
    if let Some(caps) = service_error_regex().captures(stderr) {
        let field = |i: usize| caps.get(i).map(|m| m.as_str().trim().to_string());
        if let (Some(code), Some(operation), Some(message)) = (field(1), field(2), field(3)) {
            return AwsCliError::Rejected {
                code,
                operation,
                message,
            };
        }
    }

    let stderr = stderr.trim();
    if stderr.contains("Could not connect to the endpoint URL")
        || stderr.contains("Connection was closed")
        || stderr.contains("Read timeout on endpoint URL")
    {
        return AwsCliError::Connection(stderr.to_string());
    }

    AwsCliError::Failed {
        status,
        stderr: stderr.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct AwsCli {
    context: AwsContext,
    binary: String,
    timeout: Duration,
}

impl AwsCli {
    pub fn new(context: AwsContext) -> Self {
        Self {
            context,
            binary: DEFAULT_BINARY.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn context(&self) -> &AwsContext {
        &self.context
    }

    /// Runs `aws <args> --region .. [--profile ..]` and returns stdout
    pub async fn run(&self, args: &[String]) -> Result<String, AwsCliError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .args(self.context.cli_flags())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            binary = %self.binary,
            command = %args.iter().take(2).cloned().collect::<Vec<_>>().join(" "),
            region = %self.context.region(),
            "Running aws"
        );

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| AwsCliError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| AwsCliError::Spawn {
                binary: self.binary.clone(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        trace!(stdout = %stdout, stderr = %stderr, "aws finished");

        if output.status.success() {
            Ok(stdout)
        } else {
            Err(parse_failure(output.status.code().unwrap_or(-1), &stderr))
        }
    }

    /// Like [`run`](Self::run) with `--output json`; empty output is `Null`
    pub async fn run_json(&self, args: &[String]) -> Result<Value, AwsCliError> {
        let mut args = args.to_vec();
        args.push("--output".to_string());
        args.push("json".to_string());

        let stdout = self.run(&args).await?;
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&stdout).map_err(|e| AwsCliError::InvalidOutput(e.to_string()))
    }

    /// Account ID of the current credentials
    pub async fn account_id(&self) -> Result<String, AwsCliError> {
        let identity = self
            .run_json(&["sts".to_string(), "get-caller-identity".to_string()])
            .await?;
        identity
            .get("Account")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AwsCliError::InvalidOutput("caller identity without Account".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_parse_service_error() {
        let stderr = "\nAn error occurred (ValidationError) when calling the DescribeStacks operation: Stack with id mcp-server-x does not exist\n";
        let err = parse_failure(254, stderr);

        assert_eq!(
            err,
            AwsCliError::Rejected {
                code: "ValidationError".into(),
                operation: "DescribeStacks".into(),
                message: "Stack with id mcp-server-x does not exist".into(),
            }
        );
        assert!(!err.is_transient());
        assert_eq!(err.code(), Some("ValidationError"));
    }

    #[test]
    fn test_parse_error_after_retries() {
        let stderr = "An error occurred (Throttling) when calling the DescribeStacks operation (reached max retries: 2): Rate exceeded";
        let err = parse_failure(254, stderr);

        assert_eq!(err.code(), Some("Throttling"));
        assert!(err.is_transient());
    }

    #[parameterized(
        throttling = { "Throttling", true },
        unavailable = { "ServiceUnavailable", true },
        internal = { "InternalFailure", true },
        expired = { "RequestExpired", true },
        validation = { "ValidationError", false },
        already_exists = { "AlreadyExistsException", false },
    )]
    fn test_transient_codes(code: &str, transient: bool) {
        let err = AwsCliError::Rejected {
            code: code.into(),
            operation: "CreateStack".into(),
            message: String::new(),
        };
        assert_eq!(err.is_transient(), transient);
    }

    #[test]
    fn test_connection_and_unknown_failures() {
        let err = parse_failure(
            255,
            "Could not connect to the endpoint URL: \"https://cloudformation.us-east-1.amazonaws.com/\"",
        );
        assert!(matches!(err, AwsCliError::Connection(_)));
        assert!(err.is_transient());

        let err = parse_failure(2, "usage: aws [options]\n");
        assert_eq!(
            err,
            AwsCliError::Failed {
                status: 2,
                stderr: "usage: aws [options]".into()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let cli = AwsCli::new(AwsContext::new("us-east-1"))
            .with_binary("definitely-not-an-aws-binary-on-path");
        let err = cli.run(&["sts".to_string()]).await.unwrap_err();
        assert!(matches!(err, AwsCliError::Spawn { .. }));
    }
}
