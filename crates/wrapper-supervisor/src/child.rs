//! Supervised server process
//!
//! The child's stdout and stderr are inherited so the server writes straight
//! to the operator's terminal. Stdin is the one stream that is not inherited:
//! the child gets `/dev/null` and every operator line goes through the
//! wrapper's router instead (see [`crate::router`]), so the two never read
//! from the same terminal.

use async_trait::async_trait;
use rcon_wrapper_core::{LaunchSpec, Result, WrapperError};
use std::fmt;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// How the child terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with a status code
    Code(i32),
    /// Killed by a signal (name such as `SIGTERM`)
    Signal(String),
}

impl ExitOutcome {
    /// Classify a raw exit status
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitOutcome::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signo) = status.signal() {
                let name = nix::sys::signal::Signal::try_from(signo)
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_else(|_| format!("signal {}", signo));
                return ExitOutcome::Signal(name);
            }
        }

        ExitOutcome::Code(0)
    }

    /// Exit status the wrapper should mirror
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitOutcome::Code(code) => *code,
            ExitOutcome::Signal(_) => 0,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Code(code) => write!(f, "exited with code {}", code),
            ExitOutcome::Signal(signal) => write!(f, "exited due to signal {}", signal),
        }
    }
}

/// Control surface the session needs from a child process
#[async_trait]
pub trait ChildProcess: Send {
    /// Wait for the child to terminate. Resolves once.
    async fn wait(&mut self) -> Result<ExitOutcome>;

    /// Whether termination has been observed
    fn has_exited(&self) -> bool;

    /// Ask the child to terminate gracefully (SIGTERM). Returns `false` when
    /// there was nothing to signal because the child is already gone.
    fn request_shutdown(&mut self) -> Result<bool>;
}

/// Owner of the one live server process
pub struct ChildSupervisor {
    child: Child,
    program: String,
    outcome: Option<ExitOutcome>,
}

impl ChildSupervisor {
    /// Launch the process described by `spec`
    pub fn start(spec: &LaunchSpec) -> Result<Self> {
        let child = Command::new(&spec.executable)
            .args(&spec.arguments)
            .current_dir(&spec.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                WrapperError::Spawn(format!(
                    "{} (in {}): {}",
                    spec.executable,
                    spec.working_directory.display(),
                    e
                ))
            })?;

        info!("Started {} (pid {:?})", spec.executable, child.id());
        Ok(Self {
            child,
            program: spec.executable.clone(),
            outcome: None,
        })
    }

    #[cfg(unix)]
    fn signal_terminate(&mut self) -> Result<bool> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Some(pid) = self.child.id() else {
            return Ok(false);
        };

        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(WrapperError::Process(format!(
                "Failed to send SIGTERM to {}: {}",
                self.program, e
            ))),
        }
    }

    #[cfg(not(unix))]
    fn signal_terminate(&mut self) -> Result<bool> {
        self.child
            .start_kill()
            .map(|_| true)
            .map_err(|e| WrapperError::Process(format!("Failed to stop {}: {}", self.program, e)))
    }
}

#[async_trait]
impl ChildProcess for ChildSupervisor {
    async fn wait(&mut self) -> Result<ExitOutcome> {
        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| WrapperError::Process(format!("Failed to wait for {}: {}", self.program, e)))?;

        let outcome = ExitOutcome::from_status(status);
        debug!("{} {}", self.program, outcome);
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    fn has_exited(&self) -> bool {
        self.outcome.is_some()
    }

    fn request_shutdown(&mut self) -> Result<bool> {
        if self.has_exited() {
            debug!("Shutdown requested but {} already exited", self.program);
            return Ok(false);
        }

        let sent = self.signal_terminate()?;
        if sent {
            info!("Sent SIGTERM to {}", self.program);
        }
        Ok(sent)
    }
}
