//! Console input routing
//!
//! Until the RCON link is open, typed commands cannot reach the server, so
//! the wrapper intercepts them itself and only understands `quit`. When the
//! link opens the router is rebound once to forward every line verbatim.

/// Active stdin handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Commands are handled by the wrapper
    LocalInterceptor,
    /// Commands are forwarded to RCON
    Forwarder,
}

/// What the session should do with one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    /// Ask the child to shut down gracefully
    Shutdown,
    /// Tell the operator the command was not run
    Reject(String),
    /// Send the line to the RCON link
    Forward(String),
}

/// Routes stdin lines to the active handler
#[derive(Debug)]
pub struct InputRouter {
    mode: InputMode,
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRouter {
    pub fn new() -> Self {
        Self {
            mode: InputMode::LocalInterceptor,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Switch to forwarding. Returns `false` if already forwarding; there is
    /// no way back.
    pub fn rebind(&mut self) -> bool {
        let changed = self.mode == InputMode::LocalInterceptor;
        self.mode = InputMode::Forwarder;
        changed
    }

    /// Decide what to do with `line` (line terminator already stripped)
    pub fn route(&self, line: &str) -> RouteAction {
        match self.mode {
            InputMode::Forwarder => RouteAction::Forward(line.to_string()),
            InputMode::LocalInterceptor => {
                let command = line.trim();
                if command == "quit" {
                    RouteAction::Shutdown
                } else {
                    RouteAction::Reject(format!(
                        "Unable to run \"{}\" due to RCON not being connected yet.",
                        command
                    ))
                }
            }
        }
    }
}
