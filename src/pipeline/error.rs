use crate::config::ConfigError;
use crate::deploy::DeploymentError;
use crate::detection::DetectionError;
use crate::image::BuildError;
use crate::repository::RepositoryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error("{0} is required for this run but was not configured")]
    MissingCollaborator(&'static str),

    #[error("failed to write {path}: {message}")]
    Output { path: PathBuf, message: String },
}

impl PipelineError {
    /// Stable code of the underlying failure
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Config(e) => e.reason(),
            Self::Repository(e) => e.reason(),
            Self::Detection(e) => e.reason(),
            Self::Build(e) => e.reason(),
            Self::Deployment(e) => e.reason(),
            Self::MissingCollaborator(_) => "missing-collaborator",
            Self::Output { .. } => "output-error",
        }
    }
}
