//! ManifestScanner: classifies how a repository installs its dependencies

use super::error::ManifestError;
use super::types::{PackageManager, PackageManagerProfile};
use crate::repository::RepositorySnapshot;
use tracing::{debug, warn};

pub struct ManifestScanner<'a> {
    snapshot: &'a RepositorySnapshot,
}

impl<'a> ManifestScanner<'a> {
    pub fn new(snapshot: &'a RepositorySnapshot) -> Self {
        Self { snapshot }
    }

    /// Applies the rules top to bottom, first match wins:
    /// uv, poetry, pip, setup-py, none-detected.
    ///
    /// Lockfiles for both uv and poetry is reported as ambiguous. A plain
    /// `pyproject.toml` stays none-detected but is kept as the manifest, so
    /// the project itself still gets installed.
    pub fn classify(&self) -> Result<PackageManagerProfile, ManifestError> {
        let pyproject = self.snapshot.manifest("pyproject.toml");
        let has_uv_lock = self.snapshot.has_manifest("uv.lock");
        let has_poetry_lock = self.snapshot.has_manifest("poetry.lock");

        if has_uv_lock && has_poetry_lock {
            return Err(ManifestError::AmbiguousManager(
                "both uv.lock and poetry.lock are present".to_string(),
            ));
        }

        if has_uv_lock {
            return Ok(PackageManagerProfile::new(PackageManager::Uv, "uv.lock"));
        }
        if pyproject.is_some_and(|content| has_section(content, "tool.uv")) {
            return Ok(PackageManagerProfile::new(
                PackageManager::Uv,
                "pyproject.toml",
            ));
        }

        if pyproject.is_some_and(|content| has_section(content, "tool.poetry")) {
            return Ok(PackageManagerProfile::new(
                PackageManager::Poetry,
                "pyproject.toml",
            ));
        }
        if has_poetry_lock {
            return Ok(PackageManagerProfile::new(
                PackageManager::Poetry,
                "poetry.lock",
            ));
        }

        if self.snapshot.has_manifest("requirements.txt") {
            return Ok(PackageManagerProfile::new(
                PackageManager::Pip,
                "requirements.txt",
            ));
        }

        if self.snapshot.has_manifest("setup.py") {
            return Ok(PackageManagerProfile::new(
                PackageManager::SetupPy,
                "setup.py",
            ));
        }

        if pyproject.is_some() {
            return Ok(PackageManagerProfile::new(
                PackageManager::NoneDetected,
                "pyproject.toml",
            ));
        }

        Ok(PackageManagerProfile::none_detected())
    }

    /// `classify`, with classification problems downgraded to none-detected
    pub fn scan(&self) -> PackageManagerProfile {
        match self.classify() {
            Ok(profile) => {
                debug!(
                    manager = %profile.manager,
                    manifest = ?profile.manifest_path,
                    "Package manager classified"
                );
                profile
            }
            Err(e) => {
                warn!(reason = e.reason(), error = %e, "Falling back to none-detected");
                PackageManagerProfile::none_detected()
            }
        }
    }
}

/// True when `content` has a `[section]` or `[section.sub]` table header
fn has_section(content: &str, section: &str) -> bool {
    content.lines().map(str::trim).any(|line| {
        line.strip_prefix('[')
            .map(|rest| rest.trim_start_matches('['))
            .and_then(|rest| rest.split(']').next())
            .map(str::trim)
            .is_some_and(|header| {
                header == section
                    || header
                        .strip_prefix(section)
                        .is_some_and(|tail| tail.starts_with('.'))
            })
    })
}
