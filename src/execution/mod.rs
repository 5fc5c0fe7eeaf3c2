//! Script execution engine.
//!
//! One execution is one child process, two stream readers feeding a
//! shared line channel, and an arbiter that races output, process exit
//! and the deadline:
//! - validation happens before anything is spawned
//! - trailing output is drained after a natural exit, not after a timeout
//! - every failure past validation is reported inside [`ExecutionResult`]
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use script_runner::execution::{ScriptDescriptor, ScriptExecutor};
//!
//! # async fn demo() -> script_runner::Result<()> {
//! let executor = ScriptExecutor::default();
//! let descriptor = ScriptDescriptor::file("/opt/scripts/install-nginx.sh")
//!     .env("DOMAIN", "example.com")
//!     .timeout(Duration::from_secs(600));
//!
//! let result = executor.execute(&descriptor).await?;
//! println!("exit code: {:?}", result.exit_code());
//! # Ok(())
//! # }
//! ```

mod aggregator;
mod arbiter;
mod descriptor;
mod executor;
mod launcher;
mod result;
mod state;

pub use aggregator::{read_lines, OutputAggregator};
pub use arbiter::{exit_code, Arbiter, DRAIN_GRACE};
pub use descriptor::{ScriptDescriptor, ScriptLocation};
pub use executor::{
    run_script, run_script_with_timeout, ExecutionHandle, ExecutorConfig, ScriptExecutor,
    DEFAULT_INTERPRETER, DEFAULT_TIMEOUT,
};
pub use launcher::{merged_environment, Environment, InvocationMode, LaunchedProcess, Launcher};
pub use result::{ExecutionResult, FailureKind, OutputLine, OutputSource};
pub use state::ArbiterState;
