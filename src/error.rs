//! Error types for script-runner.

use thiserror::Error;

use crate::validation::ValidationError;

/// Main error type for script-runner operations.
///
/// Subprocess failures (non-zero exit, timeout, launch failure) are not
/// errors; they are reported as data inside an
/// [`ExecutionResult`](crate::ExecutionResult).
#[derive(Error, Debug)]
pub enum ScriptRunnerError {
    /// Script failed validation before any process was spawned.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::execution::ArbiterState,
        to: crate::execution::ArbiterState,
    },

    /// Background execution task failed to join.
    #[error("execution task failed: {0}")]
    TaskJoin(String),
}

/// Convenience Result type for script-runner operations.
pub type Result<T> = std::result::Result<T, ScriptRunnerError>;
