//! Child process construction.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// How the interpreter receives the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationMode {
    /// `interpreter <path>`, run from the script's directory.
    File(PathBuf),
    /// `interpreter` with the script body written to stdin.
    Piped(Vec<u8>),
}

impl InvocationMode {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Piped(_) => "piped",
        }
    }
}

/// Environment handed to a child, built once per launch.
pub type Environment = HashMap<OsString, OsString>;

/// Merge the current process environment with overrides.
///
/// Overrides win on key collision. The result is a fresh map; the process
/// environment itself is never modified.
pub fn merged_environment(overrides: &HashMap<String, String>) -> Environment {
    let mut env: Environment = std::env::vars_os().collect();
    for (key, value) in overrides {
        env.insert(OsString::from(key), OsString::from(value));
    }
    env
}

/// A spawned script with its output streams detached from the child.
#[derive(Debug)]
pub struct LaunchedProcess {
    /// Child handle, used to wait for exit or kill.
    pub child: Child,
    /// Standard output pipe.
    pub stdout: ChildStdout,
    /// Standard error pipe.
    pub stderr: ChildStderr,
    /// Task feeding the script body in piped mode.
    pub stdin_task: Option<JoinHandle<()>>,
}

/// Builds and spawns interpreter processes.
#[derive(Debug, Clone)]
pub struct Launcher {
    interpreter: PathBuf,
}

impl Launcher {
    /// Create a launcher for the given interpreter binary.
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Interpreter binary.
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Build the command for a mode without spawning it.
    pub fn command(&self, mode: &InvocationMode, env: &Environment) -> Command {
        let mut cmd = Command::new(&self.interpreter);

        match mode {
            InvocationMode::File(path) => {
                // The working directory changes below, so a relative path
                // would no longer resolve from inside it.
                let path = std::path::absolute(path).unwrap_or_else(|_| path.clone());
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    cmd.current_dir(dir);
                }
                cmd.arg(&path).stdin(Stdio::null());
            }
            InvocationMode::Piped(_) => {
                cmd.stdin(Stdio::piped());
            }
        }

        cmd.env_clear()
            .envs(env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a kill reaches everything the script started.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    /// Spawn the interpreter.
    ///
    /// Exactly one OS process is created. In piped mode a background task
    /// writes the script body and closes stdin.
    pub fn spawn(&self, mode: InvocationMode, env: &Environment) -> std::io::Result<LaunchedProcess> {
        let mut child = self.command(&mode, env).spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr was not captured"))?;

        let stdin_task = match mode {
            InvocationMode::Piped(body) => {
                let mut stdin = child
                    .stdin
                    .take()
                    .ok_or_else(|| std::io::Error::other("stdin was not captured"))?;
                Some(tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(&body).await {
                        // Child exited before reading the whole body.
                        debug!("script stdin write failed: {}", e);
                        return;
                    }
                    if let Err(e) = stdin.shutdown().await {
                        debug!("script stdin close failed: {}", e);
                    }
                    trace!("script body written ({} bytes)", body.len());
                }))
            }
            InvocationMode::File(_) => None,
        };

        debug!(pid = ?child.id(), interpreter = %self.interpreter.display(), "process spawned");

        Ok(LaunchedProcess {
            child,
            stdout,
            stderr,
            stdin_task,
        })
    }
}

/// Kill a child and, on Unix, its whole process group.
pub(crate) fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: signalling a process group has no memory-safety preconditions.
        // The id is only available while the child is unreaped, so the group
        // still belongs to it.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, "process group kill failed: {}", std::io::Error::last_os_error());
        }
    }

    if let Err(e) = child.start_kill() {
        debug!("kill failed: {}", e);
    }
}
