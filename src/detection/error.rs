use thiserror::Error;

/// Launch-command detection failures; recoverable only through an override
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error("no usable launch command found; set build.command_override")]
    NoUsableCommand,

    #[error(
        "only docker launch commands found ({0}); override required to avoid nested containers"
    )]
    DockerOnly(String),

    #[error("command override is empty")]
    EmptyOverride,
}

impl DetectionError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoUsableCommand => "no-usable-command",
            Self::DockerOnly(_) => "docker-only",
            Self::EmptyOverride => "empty-override",
        }
    }
}

/// Package-manager classification problems. Never fatal: the scanner
/// downgrades these to `none-detected`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("ambiguous package manager: {0}")]
    AmbiguousManager(String),
}

impl ManifestError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AmbiguousManager(_) => "ambiguous-manager",
        }
    }
}
