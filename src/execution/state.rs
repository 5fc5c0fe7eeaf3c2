//! Arbiter state machine.

/// Lifecycle of one execution as seen by the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArbiterState {
    /// Process is running and output is being collected.
    #[default]
    Running,
    /// Process exited on its own and trailing output was drained.
    Completed,
    /// Deadline elapsed and the process was killed.
    TimedOut,
}

impl ArbiterState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Running -> Completed
    /// - Running -> TimedOut
    pub fn can_transition_to(&self, target: ArbiterState) -> bool {
        use ArbiterState::*;
        matches!((*self, target), (Running, Completed) | (Running, TimedOut))
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: ArbiterState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::ScriptRunnerError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ArbiterState::Completed | ArbiterState::TimedOut)
    }
}
