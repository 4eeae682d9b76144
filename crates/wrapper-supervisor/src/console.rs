//! Operator console output
//!
//! Wrapper messages go to stdout next to the server's own output. Locally
//! sourced lines pass through the [`DuplicateSuppressor`]; lines delivered
//! over RCON are printed as they are.

use crate::filter::DuplicateSuppressor;
use std::io::Write;
use tracing::warn;

/// Line writer for operator-facing messages
pub struct Console<W> {
    out: W,
    filter: DuplicateSuppressor,
}

impl Console<std::io::Stdout> {
    /// Console on the process stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            filter: DuplicateSuppressor::new(),
        }
    }

    /// Print a wrapper-originated line
    pub fn local(&mut self, line: &str) {
        if self.filter.should_emit(line) {
            self.write_line(line);
        }
    }

    /// Print a line received from the server over RCON
    pub fn remote(&mut self, line: &str) {
        self.write_line(line);
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write console output: {}", e);
        }
    }
}
