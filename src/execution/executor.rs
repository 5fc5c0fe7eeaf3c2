//! Script execution engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use super::aggregator::OutputAggregator;
use super::arbiter::Arbiter;
use super::descriptor::{ScriptDescriptor, ScriptLocation};
use super::launcher::{merged_environment, InvocationMode, Launcher};
use super::result::{ExecutionResult, OutputLine};
use crate::error::ScriptRunnerError;
use crate::source::BundledScripts;
use crate::validation::{ScriptValidator, ValidationConfig, ValidationError};
use crate::Result;

/// Default execution timeout, used when a descriptor sets none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default interpreter binary.
pub const DEFAULT_INTERPRETER: &str = "/bin/bash";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Interpreter used in both invocation modes.
    pub interpreter: PathBuf,
    /// Timeout for descriptors without one.
    pub default_timeout: Duration,
    /// Pre-launch checks.
    pub validation: ValidationConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            default_timeout: DEFAULT_TIMEOUT,
            validation: ValidationConfig::default(),
        }
    }
}

/// Runs scripts as child processes.
///
/// Every call is independent: it owns its process, reader tasks and output
/// buffer, so one executor can serve concurrent calls. Nothing limits how
/// many run at once.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    default_timeout: Duration,
    validator: Arc<ScriptValidator>,
    launcher: Launcher,
    bundled: Arc<BundledScripts>,
}

impl ScriptExecutor {
    /// Create an executor with no bundled scripts.
    pub fn new(config: ExecutorConfig) -> Self {
        let default_timeout = if config.default_timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            config.default_timeout
        };

        Self {
            default_timeout,
            validator: Arc::new(ScriptValidator::new(config.validation)),
            launcher: Launcher::new(config.interpreter),
            bundled: Arc::new(BundledScripts::new()),
        }
    }

    /// Use the given bundled store for piped-mode scripts.
    pub fn with_bundled(mut self, bundled: BundledScripts) -> Self {
        self.bundled = Arc::new(bundled);
        self
    }

    /// Bundled scripts known to this executor.
    pub fn bundled(&self) -> &BundledScripts {
        &self.bundled
    }

    /// Timeout applied to descriptors without one.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run a script and wait for its result.
    ///
    /// Returns `Err` only for validation failures, which happen before any
    /// process exists. Launch failures, non-zero exits and timeouts are
    /// reported inside the [`ExecutionResult`].
    pub async fn execute(&self, descriptor: &ScriptDescriptor) -> Result<ExecutionResult> {
        self.execute_with_sink(descriptor, None).await
    }

    /// Like [`execute`](Self::execute), also forwarding every output line
    /// to `sink` as it arrives.
    pub async fn execute_with_sink(
        &self,
        descriptor: &ScriptDescriptor,
        sink: Option<mpsc::UnboundedSender<OutputLine>>,
    ) -> Result<ExecutionResult> {
        self.validate(descriptor).await?;

        let mode = self.invocation_mode(descriptor)?;
        let timeout = descriptor.effective_timeout(self.default_timeout);
        let env = merged_environment(descriptor.environment());

        info!(
            script = %descriptor.id(),
            location = %descriptor.location(),
            mode = mode.name(),
            ?timeout,
            "starting script"
        );

        let started = Instant::now();
        let launched = match self.launcher.spawn(mode, &env) {
            Ok(launched) => launched,
            Err(e) => {
                warn!(script = %descriptor.id(), "failed to launch script: {}", e);
                return Ok(ExecutionResult::launch_failure(
                    format!(
                        "failed to launch {} with {}: {}",
                        descriptor.location(),
                        self.launcher.interpreter().display(),
                        e
                    ),
                    String::new(),
                    started.elapsed(),
                ));
            }
        };

        let mut child = launched.child;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let aggregator = OutputAggregator::start(launched.stdout, launched.stderr, tx);

        let result = Arbiter::new(sink)
            .run(&mut child, &mut rx, started, timeout)
            .await;

        // Readers and the stdin writer never outlive the call.
        drop(aggregator);
        if let Some(stdin_task) = launched.stdin_task {
            stdin_task.abort();
        }

        info!(
            script = %descriptor.id(),
            success = result.success(),
            exit_code = ?result.exit_code(),
            duration_ms = result.duration().as_millis() as u64,
            "script finished"
        );

        Ok(result)
    }

    /// Run a script, folding validation failures into the result.
    ///
    /// Never returns an error: every failure is reported as data.
    pub async fn run(
        &self,
        descriptor: &ScriptDescriptor,
        sink: Option<mpsc::UnboundedSender<OutputLine>>,
    ) -> ExecutionResult {
        match self.execute_with_sink(descriptor, sink).await {
            Ok(result) => result,
            Err(ScriptRunnerError::Validation(e)) => {
                warn!(script = %descriptor.id(), "script rejected: {}", e);
                ExecutionResult::from_validation(&e)
            }
            Err(e) => ExecutionResult::launch_failure(e.to_string(), String::new(), Duration::ZERO),
        }
    }

    /// Start a script in the background.
    ///
    /// For cooperative UIs: poll [`ExecutionHandle::lines`] for live output
    /// and await [`ExecutionHandle::wait`] for the completion message.
    pub fn spawn(&self, descriptor: ScriptDescriptor) -> ExecutionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let executor = self.clone();
        let handle =
            tokio::spawn(async move { executor.execute_with_sink(&descriptor, Some(tx)).await });

        ExecutionHandle { lines: rx, handle }
    }

    /// Run pre-launch checks. File checks touch the filesystem, so they
    /// run on the blocking pool.
    async fn validate(&self, descriptor: &ScriptDescriptor) -> Result<()> {
        match descriptor.location() {
            ScriptLocation::File(path) => {
                let validator = Arc::clone(&self.validator);
                let path = path.clone();
                tokio::task::spawn_blocking(move || validator.validate_file(&path))
                    .await
                    .map_err(|e| ScriptRunnerError::TaskJoin(e.to_string()))??;
            }
            ScriptLocation::Bundled(key) => self.validator.validate_bundled(&self.bundled, key)?,
        }
        Ok(())
    }

    fn invocation_mode(&self, descriptor: &ScriptDescriptor) -> Result<InvocationMode> {
        match descriptor.location() {
            ScriptLocation::File(path) => Ok(InvocationMode::File(path.clone())),
            ScriptLocation::Bundled(key) => {
                let body = self
                    .bundled
                    .get(key)
                    .ok_or_else(|| ValidationError::NotFound(format!("bundled:{}", key)))?;
                Ok(InvocationMode::Piped(body.to_vec()))
            }
        }
    }
}

impl Default for ScriptExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

/// A script running in the background.
#[derive(Debug)]
pub struct ExecutionHandle {
    lines: mpsc::UnboundedReceiver<OutputLine>,
    handle: JoinHandle<Result<ExecutionResult>>,
}

impl ExecutionHandle {
    /// Live output receiver. Yields `None` once the execution finished.
    pub fn lines(&mut self) -> &mut mpsc::UnboundedReceiver<OutputLine> {
        &mut self.lines
    }

    /// Receive the next live line.
    pub async fn next_line(&mut self) -> Option<OutputLine> {
        self.lines.recv().await
    }

    /// Check if the execution resolved.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result.
    pub async fn wait(self) -> Result<ExecutionResult> {
        self.handle
            .await
            .map_err(|e| ScriptRunnerError::TaskJoin(e.to_string()))?
    }
}

/// Run a script file with the default configuration.
pub async fn run_script(path: impl Into<PathBuf>) -> Result<ExecutionResult> {
    ScriptExecutor::default()
        .execute(&ScriptDescriptor::file(path))
        .await
}

/// Run a script file with a timeout.
pub async fn run_script_with_timeout(
    path: impl Into<PathBuf>,
    timeout: Duration,
) -> Result<ExecutionResult> {
    ScriptExecutor::default()
        .execute(&ScriptDescriptor::file(path).timeout(timeout))
        .await
}
