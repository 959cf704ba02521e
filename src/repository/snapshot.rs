//! Immutable view of a fetched repository

use crate::fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// README file names, checked in order; the first one found wins
pub const README_FILES: &[&str] = &[
    "README.md",
    "README.txt",
    "README.rst",
    "readme.md",
    "readme.txt",
];

/// Manifest files captured into the snapshot
pub const MANIFEST_FILES: &[&str] = &[
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "uv.lock",
    "poetry.lock",
    "package.json",
];

/// Commit and ref a snapshot was taken from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub commit_sha: String,
    pub ref_name: Option<String>,
}

impl Revision {
    pub fn new(commit_sha: impl Into<String>, ref_name: Option<String>) -> Self {
        Self {
            commit_sha: commit_sha.into(),
            ref_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    root: PathBuf,
    name: String,
    readme: Option<String>,
    manifests: BTreeMap<String, String>,
    root_files: Vec<String>,
    revision: Option<Revision>,
}

impl RepositorySnapshot {
    /// Reads README, manifests and the root file listing of `root`
    pub fn load(fs: &dyn FileSystem, root: &Path) -> anyhow::Result<Self> {
        let readme = README_FILES
            .iter()
            .map(|name| root.join(name))
            .find(|path| fs.is_file(path))
            .map(|path| fs.read_to_string(&path))
            .transpose()?;

        let mut manifests = BTreeMap::new();
        for name in MANIFEST_FILES {
            let path = root.join(name);
            if fs.is_file(&path) {
                manifests.insert((*name).to_string(), fs.read_to_string(&path)?);
            }
        }

        let root_files = fs.file_names(root)?;

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        debug!(
            root = %root.display(),
            readme = readme.is_some(),
            manifests = ?manifests.keys().collect::<Vec<_>>(),
            files = root_files.len(),
            "Repository snapshot loaded"
        );

        Ok(Self {
            root: root.to_path_buf(),
            name,
            readme,
            manifests,
            root_files,
            revision: None,
        })
    }

    /// Builds a snapshot from in-memory parts
    pub fn from_parts(
        root: PathBuf,
        readme: Option<String>,
        manifests: BTreeMap<String, String>,
        root_files: Vec<String>,
    ) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            root,
            name,
            readme,
            manifests,
            root_files,
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name of the snapshot root
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn readme(&self) -> Option<&str> {
        self.readme.as_deref()
    }

    pub fn manifest(&self, name: &str) -> Option<&str> {
        self.manifests.get(name).map(String::as_str)
    }

    pub fn has_manifest(&self, name: &str) -> bool {
        self.manifests.contains_key(name)
    }

    pub fn manifest_names(&self) -> impl Iterator<Item = &str> {
        self.manifests.keys().map(String::as_str)
    }

    pub fn root_files(&self) -> &[String] {
        &self.root_files
    }

    pub fn has_root_file(&self, name: &str) -> bool {
        self.root_files.iter().any(|f| f == name)
    }

    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }
}
