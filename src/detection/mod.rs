//! Launch-command and package-manager detection
//!
//! [`CommandExtractor`] gathers candidates from a [`RepositorySnapshot`],
//! [`ManifestScanner`] classifies the package manager, and [`resolve`] picks
//! the single entry point the proxy will wrap.

pub mod error;
pub mod fallback;
pub mod manifest;
pub mod package_manager;
pub mod proxy;
pub mod readme;
pub mod resolver;
pub mod types;

pub use error::{DetectionError, ManifestError};
pub use package_manager::ManifestScanner;
pub use proxy::{ProxyOptions, DEFAULT_PROXY_PORT};
pub use resolver::{resolve, EntrypointSpec, Resolution};
pub use types::{
    CandidateSource, CommandCandidate, PackageManager, PackageManagerProfile, Transport,
};

use crate::repository::RepositorySnapshot;
use serde::Serialize;
use tracing::{debug, info};

/// Runs the extraction rules over a snapshot, in rule order
pub struct CommandExtractor<'a> {
    snapshot: &'a RepositorySnapshot,
}

impl<'a> CommandExtractor<'a> {
    pub fn new(snapshot: &'a RepositorySnapshot) -> Self {
        Self { snapshot }
    }

    /// README JSON blocks, else README shell blocks; then pyproject and
    /// setup.py entry points; the filename fallback only if all of those
    /// came up empty.
    pub fn extract(&self) -> Vec<CommandCandidate> {
        let mut candidates = Vec::new();

        if let Some(readme) = self.snapshot.readme() {
            let from_json = readme::json_candidates(readme);
            if from_json.is_empty() {
                candidates.extend(readme::shell_candidates(readme));
            } else {
                candidates.extend(from_json);
            }
        }

        if let Some(pyproject) = self.snapshot.manifest("pyproject.toml") {
            candidates.extend(manifest::pyproject_candidates(pyproject));
        }

        if let Some(setup_py) = self.snapshot.manifest("setup.py") {
            candidates.extend(manifest::setup_py_candidates(setup_py));
        }

        if candidates.is_empty() {
            candidates.extend(fallback::fallback_candidate(self.snapshot));
        }

        debug!(count = candidates.len(), "Extracted launch-command candidates");
        candidates
    }
}

/// Everything detection learned about a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub candidates: Vec<CommandCandidate>,
    pub resolution: Resolution,
}

impl Detection {
    pub fn entrypoint(&self) -> &EntrypointSpec {
        &self.resolution.entrypoint
    }

    pub fn profile(&self) -> &PackageManagerProfile {
        &self.resolution.profile
    }
}

/// Scans, extracts and resolves in one step. With an override, extraction
/// is skipped entirely.
pub fn detect(
    snapshot: &RepositorySnapshot,
    override_tokens: Option<&[String]>,
    options: ProxyOptions,
) -> Result<Detection, DetectionError> {
    let profile = ManifestScanner::new(snapshot).scan();

    let candidates = if override_tokens.is_some() {
        Vec::new()
    } else {
        CommandExtractor::new(snapshot).extract()
    };

    let resolution = resolve(&candidates, override_tokens, &profile, options)?;

    info!(
        command = %resolution.entrypoint.command(),
        transport = %resolution.transport,
        manager = %resolution.profile.manager,
        "Detected entry point"
    );

    Ok(Detection {
        candidates,
        resolution,
    })
}
