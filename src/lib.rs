//! # script-runner
//!
//! Local script execution engine for installer and automation tooling.
//!
//! A script is described by a [`ScriptDescriptor`] (location, extra
//! environment, timeout), validated, run as a child process, and resolved
//! into an [`ExecutionResult`] carrying the captured output, exit code and
//! duration. Output can be observed line by line while the script runs.
//!
//! ## Features
//!
//! - **Two invocation modes**: scripts on disk run by path, bundled scripts
//!   are piped to the interpreter over stdin and never written to disk
//! - **Concurrent stream capture**: stdout and stderr are read by separate
//!   tasks into one ordered-per-stream line channel
//! - **Hard deadlines**: a timed-out script and its process group are killed
//!   and the call returns at the deadline
//! - **Failures as data**: launch errors, non-zero exits and timeouts are
//!   results, not errors
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use script_runner::{BundledScripts, ScriptDescriptor, ScriptExecutor};
//!
//! #[tokio::main]
//! async fn main() -> script_runner::Result<()> {
//!     script_runner::logging::try_init().ok();
//!
//!     let executor = ScriptExecutor::default().with_bundled(BundledScripts::builtin());
//!
//!     let descriptor = ScriptDescriptor::bundled("check-disk")
//!         .env("THRESHOLD", "80")
//!         .timeout(Duration::from_secs(30));
//!
//!     let result = executor.execute(&descriptor).await?;
//!     println!("success={} output={}", result.success(), result.output());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod output;
pub mod source;
pub mod validation;

// Re-export commonly used types
pub use error::{Result, ScriptRunnerError};
pub use execution::{
    ExecutionHandle, ExecutionResult, ExecutorConfig, FailureKind, OutputLine, OutputSource,
    ScriptDescriptor, ScriptExecutor, ScriptLocation,
};
pub use output::OutputSanitizer;
pub use source::{BundledScripts, ScriptsDir};
pub use validation::{PermissionPolicy, ScriptValidator, ValidationConfig, ValidationError};
