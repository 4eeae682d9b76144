//! Wrapper session: the single control loop
//!
//! The session owns the supervisor state and reacts to four sources:
//! child termination, operator input lines, RCON link events and OS
//! termination signals. Everything is handled on one task, so the state
//! needs no locking.

use crate::child::{ChildProcess, ExitOutcome};
use crate::console::Console;
use crate::router::{InputRouter, RouteAction};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use webrcon::{LinkEvent, LinkState};

const CONNECTED_MESSAGE: &str = "Connected to RCON. Generating the map now. Please wait until the server status switches to \"Running\".";
const STOPPING_MESSAGE: &str = "Received request to stop the process, stopping the game...";

/// Whether the control loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop with this process exit status
    Exit(i32),
}

/// Mutable state shared by every handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorState {
    /// Set once the child exited or the open link closed. No shutdown
    /// request is sent to the child after this.
    pub exited: bool,
    /// Last known RCON link state
    pub link: LinkState,
}

impl Default for SupervisorState {
    fn default() -> Self {
        Self {
            exited: false,
            link: LinkState::Connecting,
        }
    }
}

/// Coordinates the child process, console input and the RCON link
pub struct Session<P, W> {
    child: P,
    console: Console<W>,
    router: InputRouter,
    commands: mpsc::Sender<String>,
    state: SupervisorState,
}

impl<P, W> Session<P, W>
where
    P: ChildProcess,
    W: Write,
{
    /// `commands` feeds the RCON client; it is only used after the link opens
    pub fn new(child: P, console: Console<W>, commands: mpsc::Sender<String>) -> Self {
        Self {
            child,
            console,
            router: InputRouter::new(),
            commands,
            state: SupervisorState::default(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn console(&self) -> &Console<W> {
        &self.console
    }

    /// Run until the child exits or the open link closes, and return the
    /// exit status for the wrapper.
    pub async fn run<R>(
        &mut self,
        mut input: R,
        mut link_events: mpsc::Receiver<LinkEvent>,
        mut termination: mpsc::Receiver<&'static str>,
    ) -> i32
    where
        R: AsyncBufRead + Unpin,
    {
        let mut pending = Vec::new();
        let mut input_open = true;
        let mut link_open = true;
        let mut signals_open = true;

        loop {
            let flow = tokio::select! {
                exit = self.child.wait() => match exit {
                    Ok(outcome) => self.on_child_exit(&outcome),
                    Err(e) => {
                        error!("{}", e);
                        self.state.exited = true;
                        Flow::Exit(1)
                    }
                },
                // Partial reads stay in `pending` when another branch wins
                read = input.read_until(b'\n', &mut pending), if input_open => match read {
                    Ok(_) if pending.is_empty() => {
                        debug!("stdin closed");
                        input_open = false;
                        Flow::Continue
                    }
                    Ok(_) => {
                        let line = take_line(&mut pending);
                        self.on_input(&line)
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        input_open = false;
                        Flow::Continue
                    }
                },
                event = link_events.recv(), if link_open => match event {
                    Some(event) => self.on_link_event(event),
                    None => {
                        debug!("RCON client finished");
                        link_open = false;
                        Flow::Continue
                    }
                },
                signal = termination.recv(), if signals_open => match signal {
                    Some(name) => {
                        info!("Received {}", name);
                        self.handle_own_termination();
                        Flow::Continue
                    }
                    None => {
                        signals_open = false;
                        Flow::Continue
                    }
                },
            };

            if let Flow::Exit(code) = flow {
                return code;
            }
        }
    }

    /// Handle one operator input line
    ///
    /// Forwarding never waits: a full command queue drops the line with a
    /// warning so child exit and signals keep being handled.
    pub fn on_input(&mut self, line: &str) -> Flow {
        match self.router.route(line) {
            RouteAction::Shutdown => self.request_child_shutdown(),
            RouteAction::Reject(message) => self.console.local(&message),
            RouteAction::Forward(command) => match self.commands.try_send(command) {
                Ok(()) => {}
                Err(TrySendError::Full(command)) => {
                    warn!("RCON command queue full, dropping {:?}", command);
                }
                Err(TrySendError::Closed(command)) => {
                    warn!("RCON client is gone, dropping command {:?}", command);
                }
            },
        }
        Flow::Continue
    }

    /// Handle a notification from the RCON client
    pub fn on_link_event(&mut self, event: LinkEvent) -> Flow {
        match event {
            LinkEvent::Waiting { error, retry_in } => {
                debug!("Next RCON attempt in {:?}", retry_in);
                self.console
                    .local(&format!("Waiting for RCON to come up... (Error: {})", error));
                Flow::Continue
            }
            LinkEvent::Open => {
                self.state.link = LinkState::Open;
                self.console.local(CONNECTED_MESSAGE);
                if self.router.rebind() {
                    debug!("Console input now forwarded to RCON");
                }
                Flow::Continue
            }
            LinkEvent::Message(text) => {
                self.console.remote(&text);
                Flow::Continue
            }
            LinkEvent::Closed(info) => {
                self.state.link = LinkState::Closed;
                self.state.exited = true;
                self.console
                    .local(&format!("Connection to server closed. {}", info));
                Flow::Exit(0)
            }
        }
    }

    /// Handle termination of the child
    pub fn on_child_exit(&mut self, outcome: &ExitOutcome) -> Flow {
        self.state.exited = true;
        self.console
            .local(&format!("Main game process {}", outcome));
        Flow::Exit(outcome.exit_code())
    }

    /// The wrapper itself was asked to stop: pass it on to the child so it
    /// is never orphaned. Nothing to do once the child is gone.
    pub fn handle_own_termination(&mut self) {
        if self.state.exited || self.child.has_exited() {
            return;
        }

        self.console.local(STOPPING_MESSAGE);
        self.request_child_shutdown();
    }

    fn request_child_shutdown(&mut self) {
        if self.state.exited {
            debug!("Child already exited, ignoring shutdown request");
            return;
        }

        if let Err(e) = self.child.request_shutdown() {
            error!("{}", e);
        }
    }
}

/// Drain one raw stdin line, without its terminator. Bytes that are not
/// valid UTF-8 are replaced rather than rejected.
fn take_line(pending: &mut Vec<u8>) -> String {
    if pending.last() == Some(&b'\n') {
        pending.pop();
        if pending.last() == Some(&b'\r') {
            pending.pop();
        }
    }
    let line = String::from_utf8_lossy(pending).into_owned();
    pending.clear();
    line
}
