//! Transport abstractions for the RCON link
//!
//! The client only needs to open a connection, write text frames and read
//! text frames until the peer closes. Splitting the connection into a
//! source and a sink lets the client wait on inbound frames while still
//! writing commands.

use async_trait::async_trait;
use rcon_wrapper_core::Result;
use std::fmt;

/// Why the peer closed the connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    /// Close code, if the peer sent one
    pub code: Option<u16>,
    /// Close reason text
    pub reason: String,
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "Code: {}, Reason: {}", code, self.reason),
            None => write!(f, "Code: none, Reason: {}", self.reason),
        }
    }
}

/// One inbound event from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A text frame
    Text(String),
    /// The connection is gone; no further frames follow
    Closed(CloseInfo),
}

/// Read side of an open connection
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next text frame or the close notification
    async fn next_frame(&mut self) -> Inbound;
}

/// Write side of an open connection
#[async_trait]
pub trait FrameSink: Send {
    /// Write a complete text frame
    async fn send_text(&mut self, text: String) -> Result<()>;
}

/// An open connection, split into halves
pub type Connection = (Box<dyn FrameSource>, Box<dyn FrameSink>);

/// Opens connections to an RCON endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection to `endpoint`. Returning `Ok` means the
    /// handshake completed and the link is usable.
    async fn connect(&self, endpoint: &str) -> Result<Connection>;
}
