//! CLI integration tests.
//!
//! These tests verify the CLI argument parsing and configuration loading.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use script_runner::cli::{parse_args_from, Args};
use script_runner::config::Config;
use script_runner::{PermissionPolicy, ScriptLocation, ScriptsDir};

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("script-runner")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_defaults() {
    let result = parse_args_from(args(&[])).unwrap();

    assert!(result.script.is_none());
    assert!(result.config.is_none());
    assert!(result.scripts_dir.is_none());
    assert!(!result.quiet);
    assert!(!result.json);
    assert!(!result.no_grant);
}

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-e",
        "DOMAIN=example.com",
        "-e",
        "EMAIL=ops@example.com",
        "-t",
        "600",
        "-l",
        "debug",
        "--json",
        "install-nginx",
    ]))
    .unwrap();

    assert_eq!(result.script, Some("install-nginx".to_string()));
    assert_eq!(result.env.len(), 2);
    assert_eq!(result.timeout, Some(Duration::from_secs(600)));
    assert_eq!(result.log_level, Some("debug".to_string()));
    assert!(result.json);
}

#[test]
fn test_cli_invalid_timeout() {
    let result = parse_args_from(args(&["-t", "ten"]));
    assert!(result.is_err());
}

#[test]
fn test_cli_invalid_env() {
    let result = parse_args_from(args(&["--env", "MISSING_EQUALS"]));
    assert!(result.is_err());
}

#[test]
fn test_cli_bundled_descriptor() {
    let result = parse_args_from(args(&["--bundled", "check-disk", "-e", "THRESHOLD=75"])).unwrap();
    let descriptor = result.descriptor(&ScriptsDir::new("scripts")).unwrap();

    assert_eq!(
        descriptor.location(),
        &ScriptLocation::Bundled("check-disk".to_string())
    );
    assert_eq!(
        descriptor.environment().get("THRESHOLD"),
        Some(&"75".to_string())
    );
}

#[test]
fn test_cli_unknown_script_name() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = parse_args_from(args(&["not-there"])).unwrap();
    assert!(result.descriptor(&ScriptsDir::new(dir.path())).is_err());
}

// ============================================================================
// Configuration Priority Tests
// ============================================================================

#[test]
fn test_config_file_then_args() {
    let json = r#"{
        "scripts": {
            "dir": "/etc/installer/scripts",
            "interpreter": "/bin/sh",
            "default_timeout_secs": 300
        }
    }"#;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let mut config = Config::from_file(file.path()).unwrap();
    let cli = Args {
        scripts_dir: Some(PathBuf::from("/override/scripts")),
        no_grant: true,
        ..Args::default()
    };
    config.apply_args(&cli);

    assert_eq!(config.scripts.dir, PathBuf::from("/override/scripts"));
    assert_eq!(config.scripts.interpreter, PathBuf::from("/bin/sh"));
    assert_eq!(config.scripts.default_timeout_secs, 300);

    let exec = config.to_executor_config();
    assert_eq!(exec.default_timeout, Duration::from_secs(300));
    assert_eq!(exec.validation.permission_policy, PermissionPolicy::Deny);
}

#[test]
fn test_config_missing_file() {
    let cli = Args {
        config: Some(PathBuf::from("/nonexistent/runner.json")),
        ..Args::default()
    };
    assert!(Config::load(&cli).is_err());
}

#[test]
fn test_config_default_round_trip() {
    let config = Config::default();
    let json = serde_json::to_string(&config).unwrap();

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let loaded = Config::from_file(file.path()).unwrap();
    assert_eq!(loaded.scripts.dir, config.scripts.dir);
    assert_eq!(
        loaded.scripts.accepted_directives,
        config.scripts.accepted_directives
    );
}
