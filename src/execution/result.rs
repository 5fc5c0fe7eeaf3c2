//! Execution result types.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use crate::output::OutputSanitizer;
use crate::validation::ValidationError;

/// Why an execution did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Script missing or unreadable.
    ScriptNotFound,
    /// Script lacked the executable bit and could not be fixed.
    ScriptNotExecutable,
    /// First line is not an accepted interpreter directive.
    InvalidInterpreterDirective,
    /// The process could not be created.
    LaunchFailure,
    /// The script ran and exited with a failure status.
    NonZeroExit,
    /// The deadline elapsed before the script exited.
    Timeout,
}

impl From<&ValidationError> for FailureKind {
    fn from(err: &ValidationError) -> Self {
        match err {
            ValidationError::NotFound(_) => Self::ScriptNotFound,
            ValidationError::NotExecutable { .. } => Self::ScriptNotExecutable,
            ValidationError::InvalidInterpreterDirective { .. } => {
                Self::InvalidInterpreterDirective
            }
        }
    }
}

/// Outcome of one execution attempt.
///
/// `success` implies exit code 0 and no error message. A failed result
/// always carries an error message.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    success: bool,
    output: String,
    error_message: Option<String>,
    exit_code: Option<i32>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    duration: Duration,
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: SystemTime,
    failure: Option<FailureKind>,
}

impl ExecutionResult {
    /// Result of a process that exited on its own.
    pub(crate) fn completed(output: String, exit_code: i32, duration: Duration) -> Self {
        if exit_code == 0 {
            Self::new(true, output, None, Some(0), duration, None)
        } else {
            Self::new(
                false,
                output,
                Some(format!("script exited with status {}", exit_code)),
                Some(exit_code),
                duration,
                Some(FailureKind::NonZeroExit),
            )
        }
    }

    /// Result of a process killed at its deadline.
    pub(crate) fn deadline_exceeded(output: String, timeout: Duration, duration: Duration) -> Self {
        Self::new(
            false,
            output,
            Some(format!("script timed out after {:?}", timeout)),
            None,
            duration,
            Some(FailureKind::Timeout),
        )
    }

    /// Result of a process that could not be started or waited on.
    pub(crate) fn launch_failure(
        message: impl Into<String>,
        output: String,
        duration: Duration,
    ) -> Self {
        Self::new(
            false,
            output,
            Some(message.into()),
            None,
            duration,
            Some(FailureKind::LaunchFailure),
        )
    }

    /// Fold a validation failure into a result with zero duration.
    pub fn from_validation(err: &ValidationError) -> Self {
        Self::new(
            false,
            String::new(),
            Some(err.to_string()),
            None,
            Duration::ZERO,
            Some(FailureKind::from(err)),
        )
    }

    fn new(
        success: bool,
        output: String,
        error_message: Option<String>,
        exit_code: Option<i32>,
        duration: Duration,
        failure: Option<FailureKind>,
    ) -> Self {
        Self {
            success,
            output,
            error_message,
            exit_code,
            duration,
            timestamp: SystemTime::now(),
            failure,
        }
    }

    /// Check if the script exited 0 within its deadline.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Check if the execution failed for any reason.
    pub fn failed(&self) -> bool {
        !self.success
    }

    /// Check if the deadline elapsed.
    pub fn timed_out(&self) -> bool {
        self.failure == Some(FailureKind::Timeout)
    }

    /// Captured output, one line per emitted line.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Captured output with ANSI escape sequences removed.
    pub fn plain_output(&self) -> String {
        OutputSanitizer::strip_ansi_str(&self.output)
    }

    /// Get output as string, trimmed.
    pub fn output_trimmed(&self) -> &str {
        self.output.trim()
    }

    /// Get output lines.
    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }

    /// Error description for failed executions.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Exit code, if the process exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Wall-clock time from launch to resolution.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// When the result was produced.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Failure category, if any.
    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration.as_millis() as u64)
}

fn serialize_timestamp<S: Serializer>(ts: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
    let millis = ts
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    s.serialize_u64(millis)
}

/// One line of output delivered while a script runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Stream the line came from.
    pub source: OutputSource,
    /// Line text without its terminator.
    pub text: String,
}

/// Source of output data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl OutputLine {
    /// Create a new output line.
    pub fn new(source: OutputSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
        }
    }

    /// Create a stdout line.
    pub fn stdout(text: impl Into<String>) -> Self {
        Self::new(OutputSource::Stdout, text)
    }

    /// Create a stderr line.
    pub fn stderr(text: impl Into<String>) -> Self {
        Self::new(OutputSource::Stderr, text)
    }
}

impl std::fmt::Display for OutputLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
