use super::FileSystem;
use anyhow::{Context, Result};
use std::path::Path;

/// The local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }

    fn file_names(&self, dir: &Path) -> Result<Vec<String>> {
        let listing =
            std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?;

        let mut names = Vec::new();
        for entry in listing {
            let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
            // Follows symlinks, so a linked server.py still counts
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_names_skip_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("weather")).unwrap();
        std::fs::write(dir.path().join("server.py"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "# Weather").unwrap();

        let names = RealFileSystem.file_names(dir.path()).unwrap();
        assert_eq!(names, vec!["README.md", "server.py"]);
    }

    #[test]
    fn test_read_to_string_names_the_path_on_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("pyproject.toml");

        let err = RealFileSystem.read_to_string(&missing).unwrap_err();
        assert!(err.to_string().contains("pyproject.toml"));
        assert!(!RealFileSystem.is_file(&missing));
    }
}
