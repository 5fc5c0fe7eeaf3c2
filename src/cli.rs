//! Command-line interface for script-runner.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::execution::ScriptDescriptor;
use crate::source::ScriptsDir;
use crate::validation::ValidationError;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Script to run: a path, a name in the scripts directory, or a
    /// bundled key with `--bundled`.
    pub script: Option<String>,
    /// Treat the script as a bundled key.
    pub bundled: bool,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Timeout override.
    pub timeout: Option<Duration>,
    /// Scripts directory override.
    pub scripts_dir: Option<PathBuf>,
    /// Interpreter override.
    pub interpreter: Option<PathBuf>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Do not echo output while the script runs.
    pub quiet: bool,
    /// Print the result as JSON.
    pub json: bool,
    /// Refuse scripts without the executable bit instead of fixing them.
    pub no_grant: bool,
    /// List available scripts and exit.
    pub list: bool,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Args {
    /// Build the descriptor for the requested script.
    ///
    /// A name without a path separator is looked up in `scripts_dir`.
    pub fn descriptor(&self, scripts_dir: &ScriptsDir) -> Result<ScriptDescriptor, ValidationError> {
        let name = self
            .script
            .as_deref()
            .ok_or_else(|| ValidationError::NotFound("no script given".to_string()))?;

        let descriptor = if self.bundled {
            ScriptDescriptor::bundled(name)
        } else if name.contains('/') {
            ScriptDescriptor::file(name)
        } else {
            ScriptDescriptor::file(scripts_dir.resolve(name)?)
        };

        let descriptor = descriptor.envs(self.env.iter().cloned());
        Ok(match self.timeout {
            Some(timeout) => descriptor.timeout(timeout),
            None => descriptor,
        })
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('b') | Long("bundled") => {
                result.bundled = true;
            }
            Short('e') | Long("env") => {
                let value: String = parser.value()?.parse()?;
                let (key, val) = value
                    .split_once('=')
                    .filter(|(key, _)| !key.is_empty())
                    .ok_or_else(|| ArgsError::InvalidValue("env", value.clone()))?;
                result.env.push((key.to_string(), val.to_string()));
            }
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                let secs: u64 = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("timeout", value))?;
                result.timeout = Some(Duration::from_secs(secs));
            }
            Short('d') | Long("scripts-dir") => {
                result.scripts_dir = Some(parser.value()?.parse()?);
            }
            Short('i') | Long("interpreter") => {
                result.interpreter = Some(parser.value()?.parse()?);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Short('q') | Long("quiet") => {
                result.quiet = true;
            }
            Long("json") => {
                result.json = true;
            }
            Long("no-grant") => {
                result.no_grant = true;
            }
            Long("list") => {
                result.list = true;
            }
            Value(val) if result.script.is_none() => {
                result.script = Some(val.string()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"script-runner {version}
Run installer scripts with streamed output and a hard deadline

USAGE:
    script-runner [OPTIONS] <SCRIPT>

ARGS:
    <SCRIPT>    Script path, name inside the scripts directory,
                or bundled script key with --bundled

OPTIONS:
    -b, --bundled             Run a bundled script (piped to the interpreter)
    -e, --env <KEY=VALUE>     Set an environment variable (repeatable)
    -t, --timeout <SECS>      Timeout in seconds [default: 1800]
    -d, --scripts-dir <DIR>   Scripts directory [default: scripts]
    -i, --interpreter <PATH>  Interpreter binary [default: /bin/bash]
    -c, --config <FILE>       Path to configuration file (JSON)
    -l, --log-level <LVL>     Log level (error, warn, info, debug, trace)
    -q, --quiet               Do not echo output while the script runs
        --json                Print the result as JSON
        --no-grant            Refuse scripts without the executable bit
        --list                List bundled and directory scripts
    -h, --help                Print help
    -V, --version             Print version

ENVIRONMENT VARIABLES:
    SCRIPT_RUNNER_DIR          Scripts directory (overrides config)
    SCRIPT_RUNNER_INTERPRETER  Interpreter binary (overrides config)
    SCRIPT_RUNNER_TIMEOUT      Default timeout in seconds (overrides config)
    SCRIPT_RUNNER_LOG_LEVEL    Log level (overrides config)
    RUST_LOG                   Alternative log level setting

EXIT STATUS:
    The script's own exit code, 124 on timeout, 2 if the script was rejected.

EXAMPLES:
    # Run scripts/install-nginx.sh with a domain
    script-runner -e DOMAIN=example.com install-nginx

    # Run a bundled script with a one minute limit
    script-runner --bundled -t 60 system-info

    # Machine-readable result
    script-runner --json -q ./deploy.sh
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("script-runner {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
