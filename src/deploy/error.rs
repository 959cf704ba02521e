use super::status::StackStatus;
use crate::aws::AwsCliError;
use thiserror::Error;

/// Transport-level failure talking to the infrastructure engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine invocation failed: {0}")]
    Invocation(String),

    #[error("unexpected engine response: {0}")]
    InvalidResponse(String),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<AwsCliError> for EngineError {
    fn from(e: AwsCliError) -> Self {
        if e.is_transient() {
            return Self::Unavailable(e.to_string());
        }
        match e {
            AwsCliError::Rejected { code, message, .. } => Self::Rejected { code, message },
            AwsCliError::InvalidOutput(msg) => Self::InvalidResponse(msg),
            other => Self::Invocation(other.to_string()),
        }
    }
}

fn format_events(events: &[String]) -> String {
    if events.is_empty() {
        "no failure events recorded".to_string()
    } else {
        events.join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeploymentError {
    #[error("stack {stack} is in {status} state; delete it before deploying again")]
    StaleFailedStack { stack: String, status: StackStatus },

    #[error("stack {stack} still {last_status} after {waited_secs}s; the operation continues remotely")]
    Timeout {
        stack: String,
        waited_secs: u64,
        last_status: StackStatus,
    },

    #[error("stack {stack} creation failed: {}", format_events(.events))]
    CreateFailed { stack: String, events: Vec<String> },

    #[error("stack {stack} update failed: {}", format_events(.events))]
    UpdateFailed { stack: String, events: Vec<String> },

    #[error("stack {stack} is in unsupported state {raw_status}")]
    UnexpectedStatus { stack: String, raw_status: String },

    #[error("stack {stack} has no output {key}")]
    MissingOutput { stack: String, key: String },

    #[error("template error: {0}")]
    Template(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl DeploymentError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::StaleFailedStack { .. } => "stale-failed-stack",
            Self::Timeout { .. } => "timeout",
            Self::CreateFailed { .. } => "create-failed",
            Self::UpdateFailed { .. } => "update-failed",
            Self::UnexpectedStatus { .. } => "unexpected-status",
            Self::MissingOutput { .. } => "missing-output",
            Self::Template(_) => "template-error",
            Self::Engine(_) => "engine-error",
        }
    }

    /// Failure events attached to the error, most recent first
    pub fn events(&self) -> &[String] {
        match self {
            Self::CreateFailed { events, .. } | Self::UpdateFailed { events, .. } => events,
            _ => &[],
        }
    }
}
