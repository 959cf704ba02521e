use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("invalid GitHub URL '{0}': expected https://github.com/<owner>/<repo>")]
    InvalidUrl(String),

    #[error("repository or branch not found: {0}")]
    NotFound(String),

    #[error("authentication required to access {0} (set GITHUB_TOKEN)")]
    AuthRequired(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("subfolder '{0}' not found in repository")]
    SubfolderNotFound(String),

    #[error("failed to unpack repository archive: {0}")]
    Archive(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RepositoryError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid-url",
            Self::NotFound(_) => "not-found",
            Self::AuthRequired(_) => "auth-required",
            Self::Network(_) => "network-error",
            Self::SubfolderNotFound(_) => "subfolder-not-found",
            Self::Archive(_) => "archive-error",
            Self::Io(_) => "io-error",
        }
    }

    /// Only connection-level failures are worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for RepositoryError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
