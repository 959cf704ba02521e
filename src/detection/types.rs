use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a launch command was found.
///
/// Variant order is the selection preference: earlier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateSource {
    ReadmeJson,
    PyprojectScript,
    SetupPyEntrypoint,
    ReadmeCodeBlock,
    FallbackFilename,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadmeJson => "readme-json",
            Self::PyprojectScript => "pyproject-script",
            Self::SetupPyEntrypoint => "setup-py-entrypoint",
            Self::ReadmeCodeBlock => "readme-code-block",
            Self::FallbackFilename => "fallback-filename",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the launch command starts the server.
///
/// Variant order is the selection preference among non-docker transports;
/// `Docker` is last and never selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    Uvx,
    Npx,
    StdioDirect,
    Docker,
}

impl Transport {
    /// Classifies a launch command by its executable name
    pub fn classify(command: &str) -> Self {
        match command {
            "docker" => Self::Docker,
            "npx" => Self::Npx,
            "uvx" => Self::Uvx,
            _ => Self::StdioDirect,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uvx => "uvx",
            Self::Npx => "npx",
            Self::StdioDirect => "stdio-direct",
            Self::Docker => "docker",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One possible way to launch the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCandidate {
    pub tokens: Vec<String>,
    pub source: CandidateSource,
    pub transport: Transport,
}

impl CommandCandidate {
    /// Builds a candidate, classifying the transport from the first token.
    /// Returns `None` for an empty or blank command.
    pub fn new(tokens: Vec<String>, source: CandidateSource) -> Option<Self> {
        let command = tokens.first()?;
        if command.trim().is_empty() {
            return None;
        }
        let transport = Transport::classify(command);
        Some(Self {
            tokens,
            source,
            transport,
        })
    }

    pub fn command(&self) -> &str {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    pub fn is_docker(&self) -> bool {
        self.transport == Transport::Docker
    }
}

impl fmt::Display for CommandCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}]",
            self.tokens.join(" "),
            self.source,
            self.transport
        )
    }
}

/// Dependency-management approach of a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageManager {
    Pip,
    Uv,
    Poetry,
    SetupPy,
    NoneDetected,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pip => "pip",
            Self::Uv => "uv",
            Self::Poetry => "poetry",
            Self::SetupPy => "setup-py",
            Self::NoneDetected => "none-detected",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManagerProfile {
    pub manager: PackageManager,
    pub manifest_path: Option<String>,
}

impl PackageManagerProfile {
    pub fn new(manager: PackageManager, manifest_path: impl Into<String>) -> Self {
        Self {
            manager,
            manifest_path: Some(manifest_path.into()),
        }
    }

    pub fn none_detected() -> Self {
        Self {
            manager: PackageManager::NoneDetected,
            manifest_path: None,
        }
    }
}
