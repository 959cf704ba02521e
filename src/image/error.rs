use crate::aws::AwsCliError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid environment variable '{name}': {problem}")]
    InvalidEnvironment { name: String, problem: &'static str },

    #[error("cannot read Dockerfile {path}: {message}")]
    DockerfileUnreadable { path: String, message: String },

    #[error("failed to prepare build context: {0}")]
    Context(#[from] std::io::Error),

    #[error("docker daemon error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("image build failed: {0}")]
    BuildFailed(String),

    #[error("image push failed: {0}")]
    PushFailed(String),

    #[error("container registry error: {0}")]
    Registry(#[from] AwsCliError),
}

impl BuildError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidEnvironment { .. } => "invalid-environment",
            Self::DockerfileUnreadable { .. } => "dockerfile-unreadable",
            Self::Context(_) => "build-context",
            Self::Docker(_) => "docker-error",
            Self::BuildFailed(_) => "build-failed",
            Self::PushFailed(_) => "push-failed",
            Self::Registry(_) => "registry-error",
        }
    }
}
