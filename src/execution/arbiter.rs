//! Resolution of output, exit and deadline into one result.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use super::launcher::terminate;
use super::result::{ExecutionResult, OutputLine};
use super::state::ArbiterState;

/// How long to keep reading output that is still in flight after exit.
pub const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Waits on a running script and builds its result.
///
/// The output buffer is owned here and only written from this task; the
/// stream readers hand lines over through the channel.
pub struct Arbiter {
    state: ArbiterState,
    output: String,
    sink: Option<mpsc::UnboundedSender<OutputLine>>,
}

impl Arbiter {
    /// Create an arbiter, optionally forwarding every line to `sink`.
    pub fn new(sink: Option<mpsc::UnboundedSender<OutputLine>>) -> Self {
        Self {
            state: ArbiterState::Running,
            output: String::new(),
            sink,
        }
    }

    /// Current state.
    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// Race output, process exit and the deadline.
    ///
    /// On exit, lines still in flight are drained before the result is
    /// built. On deadline, the process is killed and the result is built
    /// at once from what was collected so far.
    pub async fn run(
        mut self,
        child: &mut Child,
        lines: &mut mpsc::UnboundedReceiver<OutputLine>,
        started: Instant,
        timeout: Duration,
    ) -> ExecutionResult {
        let deadline = started + timeout;
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        let mut streams_open = true;

        loop {
            tokio::select! {
                line = lines.recv(), if streams_open => match line {
                    Some(line) => self.record(line),
                    None => {
                        trace!("all output streams closed");
                        streams_open = false;
                    }
                },
                status = child.wait() => {
                    return match status {
                        Ok(status) => {
                            self.drain(lines, deadline).await;
                            self.finish(ArbiterState::Completed);
                            ExecutionResult::completed(
                                self.output,
                                exit_code(status),
                                started.elapsed(),
                            )
                        }
                        Err(e) => {
                            error!("failed to wait for script: {}", e);
                            terminate(child);
                            self.finish(ArbiterState::Completed);
                            ExecutionResult::launch_failure(
                                format!("failed to wait for script: {}", e),
                                self.output,
                                started.elapsed(),
                            )
                        }
                    };
                }
                _ = &mut sleep => {
                    warn!(?timeout, "script deadline elapsed, killing process");
                    terminate(child);
                    self.finish(ArbiterState::TimedOut);
                    return ExecutionResult::deadline_exceeded(
                        self.output,
                        timeout,
                        started.elapsed(),
                    );
                }
            }
        }
    }

    fn record(&mut self, line: OutputLine) {
        self.output.push_str(&line.text);
        self.output.push('\n');

        if let Some(sink) = &self.sink {
            if sink.send(line).is_err() {
                debug!("output sink closed, continuing without live output");
                self.sink = None;
            }
        }
    }

    /// Consume lines produced before exit but not yet received.
    ///
    /// Stops when both streams close, or after [`DRAIN_GRACE`] in case a
    /// background process inherited the pipes, or at the deadline.
    async fn drain(&mut self, lines: &mut mpsc::UnboundedReceiver<OutputLine>, deadline: Instant) {
        let until = (Instant::now() + DRAIN_GRACE).min(deadline);

        loop {
            match tokio::time::timeout_at(until, lines.recv()).await {
                Ok(Some(line)) => self.record(line),
                Ok(None) => break,
                Err(_) => {
                    debug!("output drain stopped, streams still open after exit");
                    break;
                }
            }
        }
    }

    fn finish(&mut self, target: ArbiterState) {
        if let Err(e) = self.state.transition_to(target) {
            error!("arbiter: {}", e);
        }
    }
}

/// Map an exit status to a numeric code.
///
/// A process killed by signal `n` maps to `128 + n`, as shells report it.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_arbiter_is_running() {
        let arbiter = Arbiter::new(None);
        assert_eq!(arbiter.state(), ArbiterState::Running);
    }

    #[test]
    fn test_record_appends_and_forwards() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut arbiter = Arbiter::new(Some(tx));

        arbiter.record(OutputLine::stdout("first"));
        arbiter.record(OutputLine::stderr("second"));

        assert_eq!(arbiter.output, "first\nsecond\n");
        assert_eq!(rx.try_recv().unwrap().text, "first");
        assert_eq!(rx.try_recv().unwrap().text, "second");
    }

    #[test]
    fn test_record_survives_closed_sink() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut arbiter = Arbiter::new(Some(tx));

        arbiter.record(OutputLine::stdout("kept"));

        assert_eq!(arbiter.output, "kept\n");
        assert!(arbiter.sink.is_none());
    }

    #[test]
    fn test_finish_only_once() {
        let mut arbiter = Arbiter::new(None);
        arbiter.finish(ArbiterState::TimedOut);
        arbiter.finish(ArbiterState::Completed);
        assert_eq!(arbiter.state(), ArbiterState::TimedOut);
    }

    #[tokio::test]
    async fn test_drain_reads_until_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(OutputLine::stdout("late1")).unwrap();
        tx.send(OutputLine::stdout("late2")).unwrap();
        drop(tx);

        let mut arbiter = Arbiter::new(None);
        arbiter
            .drain(&mut rx, Instant::now() + Duration::from_secs(5))
            .await;

        assert_eq!(arbiter.output, "late1\nlate2\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_gives_up_on_open_stream() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(OutputLine::stdout("only")).unwrap();

        let mut arbiter = Arbiter::new(None);
        let start = Instant::now();
        arbiter
            .drain(&mut rx, Instant::now() + Duration::from_secs(60))
            .await;

        assert_eq!(arbiter.output, "only\n");
        assert!(start.elapsed() >= DRAIN_GRACE);
        drop(tx);
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_mapping() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        // Raw wait status: exit code lives in the high byte.
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        // Killed by SIGKILL (9).
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }
}
