//! Pre-launch script validation.
//!
//! File-backed scripts must exist, start with an accepted interpreter
//! directive, and carry an executable bit. Bundled scripts only need to be
//! present in the store.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::execution::{ScriptDescriptor, ScriptLocation};
use crate::source::BundledScripts;

/// Interpreter directives accepted by default.
pub const DEFAULT_DIRECTIVES: &[&str] = &["#!/bin/bash", "#!/bin/sh"];

/// Upper bound on how much of the first line is inspected.
const MAX_DIRECTIVE_LEN: u64 = 256;

/// What to do with a file-mode script that has no executable bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionPolicy {
    /// Add the executable bits and log the change.
    #[default]
    Grant,
    /// Refuse the script.
    Deny,
}

/// Validation configuration.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Handling of scripts lacking the executable bit.
    pub permission_policy: PermissionPolicy,
    /// Whether file-mode scripts must start with an accepted directive.
    pub require_directive: bool,
    /// Accepted first lines.
    pub accepted_directives: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            permission_policy: PermissionPolicy::Grant,
            require_directive: true,
            accepted_directives: DEFAULT_DIRECTIVES.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl ValidationConfig {
    /// Config that never touches file permissions.
    pub fn strict() -> Self {
        Self {
            permission_policy: PermissionPolicy::Deny,
            ..Self::default()
        }
    }
}

/// Reasons a script is rejected before launch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Script does not exist or cannot be read.
    #[error("script not found: {0}")]
    NotFound(String),

    /// Script is not executable and could not be made so.
    #[error("script not executable: {path}: {reason}")]
    NotExecutable { path: PathBuf, reason: String },

    /// First line is not an accepted interpreter directive.
    #[error("invalid interpreter directive in {path}: {found:?}")]
    InvalidInterpreterDirective { path: PathBuf, found: String },
}

/// Script validator.
#[derive(Debug, Default)]
pub struct ScriptValidator {
    config: ValidationConfig,
}

impl ScriptValidator {
    /// Create a new validator with the given config.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a descriptor against its source.
    pub fn validate(
        &self,
        descriptor: &ScriptDescriptor,
        bundled: &BundledScripts,
    ) -> Result<(), ValidationError> {
        match descriptor.location() {
            ScriptLocation::File(path) => self.validate_file(path),
            ScriptLocation::Bundled(key) => self.validate_bundled(bundled, key),
        }
    }

    /// Validate a bundled script. Only presence is checked.
    pub fn validate_bundled(
        &self,
        bundled: &BundledScripts,
        key: &str,
    ) -> Result<(), ValidationError> {
        if bundled.contains(key) {
            Ok(())
        } else {
            Err(ValidationError::NotFound(format!("bundled:{}", key)))
        }
    }

    /// Validate a script on disk.
    ///
    /// The directive is checked before permissions so that a rejected
    /// script is never modified.
    pub fn validate_file(&self, path: &Path) -> Result<(), ValidationError> {
        let metadata = std::fs::metadata(path)
            .map_err(|_| ValidationError::NotFound(path.display().to_string()))?;

        if !metadata.is_file() {
            return Err(ValidationError::NotFound(path.display().to_string()));
        }

        if self.config.require_directive {
            self.check_directive(path)?;
        }

        self.ensure_executable(path, &metadata)?;

        debug!(path = %path.display(), "script validated");
        Ok(())
    }

    /// Check the first line against the accepted directives.
    fn check_directive(&self, path: &Path) -> Result<(), ValidationError> {
        let file =
            File::open(path).map_err(|_| ValidationError::NotFound(path.display().to_string()))?;

        let mut first = Vec::new();
        BufReader::new(file)
            .take(MAX_DIRECTIVE_LEN)
            .read_until(b'\n', &mut first)
            .map_err(|_| ValidationError::NotFound(path.display().to_string()))?;

        let line = String::from_utf8_lossy(&first);
        let line = line.trim_end();

        if self.is_accepted(line) {
            Ok(())
        } else {
            Err(ValidationError::InvalidInterpreterDirective {
                path: path.to_path_buf(),
                found: line.to_string(),
            })
        }
    }

    fn is_accepted(&self, line: &str) -> bool {
        self.config.accepted_directives.iter().any(|directive| {
            line == directive
                || line
                    .strip_prefix(directive.as_str())
                    .is_some_and(|rest| rest.starts_with(char::is_whitespace))
        })
    }

    #[cfg(unix)]
    fn ensure_executable(
        &self,
        path: &Path,
        metadata: &std::fs::Metadata,
    ) -> Result<(), ValidationError> {
        use std::os::unix::fs::PermissionsExt;

        let mode = metadata.permissions().mode();
        if mode & 0o111 != 0 {
            return Ok(());
        }

        if self.config.permission_policy == PermissionPolicy::Deny {
            return Err(ValidationError::NotExecutable {
                path: path.to_path_buf(),
                reason: "executable bit not set".to_string(),
            });
        }

        let new_mode = mode | 0o111;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(new_mode)).map_err(|e| {
            ValidationError::NotExecutable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        warn!(
            path = %path.display(),
            old_mode = %format!("{:o}", mode & 0o7777),
            new_mode = %format!("{:o}", new_mode & 0o7777),
            "granted executable permission to script"
        );
        Ok(())
    }

    #[cfg(not(unix))]
    fn ensure_executable(
        &self,
        _path: &Path,
        _metadata: &std::fs::Metadata,
    ) -> Result<(), ValidationError> {
        Ok(())
    }
}
