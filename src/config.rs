//! Configuration management for script-runner.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::execution::{ExecutorConfig, DEFAULT_INTERPRETER, DEFAULT_TIMEOUT};
use crate::validation::{PermissionPolicy, ValidationConfig, DEFAULT_DIRECTIVES};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Script execution configuration.
    pub scripts: ScriptsSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Script execution section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsSection {
    /// Directory holding user-maintained scripts.
    pub dir: PathBuf,
    /// Interpreter binary.
    pub interpreter: PathBuf,
    /// Timeout in seconds for scripts that set none.
    pub default_timeout_secs: u64,
    /// Add the executable bit to scripts that lack it.
    pub grant_executable: bool,
    /// Require an interpreter directive on file-mode scripts.
    pub require_directive: bool,
    /// Accepted interpreter directives.
    pub accepted_directives: Vec<String>,
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("scripts"),
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            default_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            grant_executable: true,
            require_directive: true,
            accepted_directives: DEFAULT_DIRECTIVES.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = std::env::var("SCRIPT_RUNNER_DIR") {
            self.scripts.dir = PathBuf::from(dir);
        }

        if let Ok(interpreter) = std::env::var("SCRIPT_RUNNER_INTERPRETER") {
            self.scripts.interpreter = PathBuf::from(interpreter);
        }

        if let Ok(timeout) = std::env::var("SCRIPT_RUNNER_TIMEOUT") {
            self.scripts.default_timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SCRIPT_RUNNER_TIMEOUT", timeout))?;
        }

        if let Ok(level) = std::env::var("SCRIPT_RUNNER_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref dir) = args.scripts_dir {
            self.scripts.dir = dir.clone();
        }

        if let Some(ref interpreter) = args.interpreter {
            self.scripts.interpreter = interpreter.clone();
        }

        if args.no_grant {
            self.scripts.grant_executable = false;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env()?;
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to the engine configuration.
    pub fn to_executor_config(&self) -> ExecutorConfig {
        let permission_policy = if self.scripts.grant_executable {
            PermissionPolicy::Grant
        } else {
            PermissionPolicy::Deny
        };

        ExecutorConfig {
            interpreter: self.scripts.interpreter.clone(),
            default_timeout: Duration::from_secs(self.scripts.default_timeout_secs),
            validation: ValidationConfig {
                permission_policy,
                require_directive: self.scripts.require_directive,
                accepted_directives: self.scripts.accepted_directives.clone(),
            },
        }
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Environment variable with an unusable value.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidValue(name, value) => write!(f, "invalid value for {}: '{}'", name, value),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scripts.dir, PathBuf::from("scripts"));
        assert_eq!(config.scripts.interpreter, PathBuf::from("/bin/bash"));
        assert_eq!(config.scripts.default_timeout_secs, 1800);
        assert!(config.scripts.grant_executable);
        assert!(config.scripts.require_directive);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "scripts": {
                "dir": "/etc/installer/scripts",
                "interpreter": "/bin/sh",
                "default_timeout_secs": 120,
                "grant_executable": false
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.scripts.dir, PathBuf::from("/etc/installer/scripts"));
        assert_eq!(config.scripts.interpreter, PathBuf::from("/bin/sh"));
        assert_eq!(config.scripts.default_timeout_secs, 120);
        assert!(!config.scripts.grant_executable);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{
            "scripts": {
                "default_timeout_secs": 60
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.scripts.interpreter, PathBuf::from("/bin/bash")); // Default
        assert_eq!(config.scripts.default_timeout_secs, 60);
        assert_eq!(config.scripts.accepted_directives.len(), 2);
    }

    #[test]
    fn test_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file(Path::new("/no/such/config.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            scripts_dir: Some(PathBuf::from("/srv/scripts")),
            interpreter: Some(PathBuf::from("/bin/sh")),
            no_grant: true,
            log_level: Some("trace".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.scripts.dir, PathBuf::from("/srv/scripts"));
        assert_eq!(config.scripts.interpreter, PathBuf::from("/bin/sh"));
        assert!(!config.scripts.grant_executable);
        assert_eq!(config.log_filter(), "trace");
    }

    #[test]
    fn test_apply_args_keeps_unset_values() {
        let mut config = Config::default();
        config.scripts.dir = PathBuf::from("/from/file");

        config.apply_args(&Args::default());

        assert_eq!(config.scripts.dir, PathBuf::from("/from/file"));
        assert!(config.scripts.grant_executable);
    }

    #[test]
    fn test_to_executor_config() {
        let mut config = Config::default();
        config.scripts.default_timeout_secs = 5;
        config.scripts.grant_executable = false;
        config.scripts.require_directive = false;

        let exec = config.to_executor_config();

        assert_eq!(exec.interpreter, PathBuf::from("/bin/bash"));
        assert_eq!(exec.default_timeout, Duration::from_secs(5));
        assert_eq!(exec.validation.permission_policy, PermissionPolicy::Deny);
        assert!(!exec.validation.require_directive);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"interpreter\""));
        assert!(json.contains("\"default_timeout_secs\""));
    }
}
