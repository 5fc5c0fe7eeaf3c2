//! Scripts stored in a directory on disk.

use std::path::{Path, PathBuf};

use crate::validation::ValidationError;

/// Extension tried when a name is given without one.
const SCRIPT_EXTENSION: &str = "sh";

/// A trusted directory of user-maintained scripts.
#[derive(Debug, Clone)]
pub struct ScriptsDir {
    root: PathBuf,
}

impl ScriptsDir {
    /// Create a handle for the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a script name to a path inside the directory.
    ///
    /// Names must be plain file names. `foo` resolves to `foo.sh` when
    /// `foo` itself does not exist. Fails with
    /// [`ValidationError::NotFound`] when nothing matches.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ValidationError> {
        let candidate = self.root.join(name);

        if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(ValidationError::NotFound(candidate.display().to_string()));
        }

        if candidate.is_file() {
            return Ok(candidate);
        }

        if Path::new(name).extension().is_none() {
            let with_ext = candidate.with_extension(SCRIPT_EXTENSION);
            if with_ext.is_file() {
                return Ok(with_ext);
            }
        }

        Err(ValidationError::NotFound(candidate.display().to_string()))
    }

    /// Sorted names of the regular files in the directory.
    pub fn list(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
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

    fn scripts_dir() -> (TempDir, ScriptsDir) {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("install.sh"), "#!/bin/sh\necho hi\n").unwrap();
        std::fs::write(tmp.path().join("README"), "notes").unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        let dir = ScriptsDir::new(tmp.path());
        (tmp, dir)
    }

    #[test]
    fn test_resolve_exact_name() {
        let (tmp, dir) = scripts_dir();
        let path = dir.resolve("install.sh").unwrap();
        assert_eq!(path, tmp.path().join("install.sh"));
    }

    #[test]
    fn test_resolve_adds_extension() {
        let (tmp, dir) = scripts_dir();
        let path = dir.resolve("install").unwrap();
        assert_eq!(path, tmp.path().join("install.sh"));
    }

    #[test]
    fn test_resolve_missing() {
        let (_tmp, dir) = scripts_dir();
        let err = dir.resolve("missing").unwrap_err();
        assert!(matches!(err, ValidationError::NotFound(_)));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_tmp, dir) = scripts_dir();
        assert!(dir.resolve("../etc/passwd").is_err());
        assert!(dir.resolve("nested/install.sh").is_err());
        assert!(dir.resolve("").is_err());
    }

    #[test]
    fn test_resolve_directory_is_not_a_script() {
        let (_tmp, dir) = scripts_dir();
        assert!(dir.resolve("nested").is_err());
    }

    #[test]
    fn test_list_files_only() {
        let (_tmp, dir) = scripts_dir();
        let names = dir.list().unwrap();
        assert_eq!(names, vec!["README".to_string(), "install.sh".to_string()]);
    }

    #[test]
    fn test_list_missing_dir() {
        let dir = ScriptsDir::new("/definitely/not/here");
        assert!(dir.list().is_err());
    }
}
