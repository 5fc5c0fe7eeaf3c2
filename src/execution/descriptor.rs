//! Script invocation requests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the script body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLocation {
    /// A file on disk, run in file mode.
    File(PathBuf),
    /// A key into the bundled store, run in piped mode.
    Bundled(String),
}

impl std::fmt::Display for ScriptLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Bundled(key) => write!(f, "bundled:{}", key),
        }
    }
}

/// A request to run one script.
///
/// Built with the chained setters below, then handed to the executor by
/// reference. Fields are read-only once built.
#[derive(Debug, Clone)]
pub struct ScriptDescriptor {
    identifier: String,
    location: ScriptLocation,
    environment: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl ScriptDescriptor {
    /// Describe a script file on disk.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::with_location(identifier, ScriptLocation::File(path))
    }

    /// Describe a script from the bundled store.
    pub fn bundled(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::with_location(key.clone(), ScriptLocation::Bundled(key))
    }

    fn with_location(identifier: String, location: ScriptLocation) -> Self {
        Self {
            identifier,
            location,
            environment: HashMap::new(),
            timeout: None,
        }
    }

    /// Set the display identifier.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.environment.insert(k.into(), v.into());
        }
        self
    }

    /// Set the execution timeout. Zero means "use the default".
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Display identifier.
    pub fn id(&self) -> &str {
        &self.identifier
    }

    /// Script location.
    pub fn location(&self) -> &ScriptLocation {
        &self.location
    }

    /// Path of a file-mode script.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            ScriptLocation::File(path) => Some(path),
            ScriptLocation::Bundled(_) => None,
        }
    }

    /// Environment overrides.
    pub fn environment(&self) -> &HashMap<String, String> {
        &self.environment
    }

    /// Requested timeout, if any.
    pub fn requested_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Timeout to apply, falling back to `default` when unset or zero.
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.filter(|t| !t.is_zero()).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_descriptor() {
        let desc = ScriptDescriptor::file("/opt/scripts/install-nginx.sh");
        assert_eq!(desc.id(), "install-nginx");
        assert_eq!(
            desc.location(),
            &ScriptLocation::File(PathBuf::from("/opt/scripts/install-nginx.sh"))
        );
        assert_eq!(desc.path(), Some(Path::new("/opt/scripts/install-nginx.sh")));
        assert!(desc.environment().is_empty());
        assert!(desc.requested_timeout().is_none());
    }

    #[test]
    fn test_bundled_descriptor() {
        let desc = ScriptDescriptor::bundled("system-info");
        assert_eq!(desc.id(), "system-info");
        assert_eq!(
            desc.location(),
            &ScriptLocation::Bundled("system-info".to_string())
        );
        assert!(desc.path().is_none());
    }

    #[test]
    fn test_descriptor_chain() {
        let desc = ScriptDescriptor::file("run.sh")
            .identifier("Run it")
            .env("DOMAIN", "example.com")
            .timeout(Duration::from_secs(60));

        assert_eq!(desc.id(), "Run it");
        assert_eq!(
            desc.environment().get("DOMAIN"),
            Some(&"example.com".to_string())
        );
        assert_eq!(desc.requested_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_descriptor_envs() {
        let vars = [("KEY1", "val1"), ("KEY2", "val2"), ("KEY1", "val3")];
        let desc = ScriptDescriptor::bundled("x").envs(vars);

        assert_eq!(desc.environment().len(), 2);
        assert_eq!(desc.environment().get("KEY1"), Some(&"val3".to_string()));
    }

    #[test]
    fn test_effective_timeout() {
        let default = Duration::from_secs(1800);

        let unset = ScriptDescriptor::bundled("x");
        assert_eq!(unset.effective_timeout(default), default);

        let zero = ScriptDescriptor::bundled("x").timeout(Duration::ZERO);
        assert_eq!(zero.effective_timeout(default), default);

        let set = ScriptDescriptor::bundled("x").timeout(Duration::from_secs(5));
        assert_eq!(set.effective_timeout(default), Duration::from_secs(5));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(
            ScriptLocation::File(PathBuf::from("/a/b.sh")).to_string(),
            "/a/b.sh"
        );
        assert_eq!(
            ScriptLocation::Bundled("check-disk".into()).to_string(),
            "bundled:check-disk"
        );
    }
}
