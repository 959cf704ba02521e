use anyhow::Result;
use std::path::Path;

/// Read-only view of a checked-out repository.
///
/// Snapshotting only looks at regular files: a few well-known names get
/// read, and the top-level directory gets listed.
pub trait FileSystem: Send + Sync {
    fn is_file(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Names of the regular files directly inside `dir`, sorted.
    /// Subdirectories are left out.
    fn file_names(&self, dir: &Path) -> Result<Vec<String>>;
}
