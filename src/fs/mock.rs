use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// In-memory repository for tests. Directories exist implicitly as the
/// parents of added files.
pub struct MockFileSystem {
    root: PathBuf,
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MockFileSystem {
    /// Rooted at `/repo`
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/repo"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            files: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative paths are placed under the root
    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = self.root.join(path);
        self.files().insert(path, content.to_string());
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        self.files().contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {}", path.display()))
    }

    fn file_names(&self, dir: &Path) -> Result<Vec<String>> {
        let files = self.files();
        if dir != self.root.as_path() && !files.keys().any(|p| p.starts_with(dir)) {
            return Err(anyhow!("no such directory: {}", dir.display()));
        }

        // Keys are sorted, so the names come out sorted too
        Ok(files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect())
    }
}
