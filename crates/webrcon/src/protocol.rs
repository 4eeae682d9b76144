//! WebRcon wire protocol
//!
//! Each frame is a single JSON object with PascalCase fields:
//! `{"Identifier": -1, "Message": "status", "Name": "WebRcon"}`.
//!
//! Outbound frames always carry all three fields. Inbound frames are only
//! read for `Message`; servers add fields such as `Type` or `Stacktrace`,
//! which are ignored.

use rcon_wrapper_core::{Result, WrapperError};
use serde::{Deserialize, Serialize};

/// Identifier used for every operator-issued command
pub const COMMAND_IDENTIFIER: i32 = -1;

/// Client name sent with every command
pub const CLIENT_NAME: &str = "WebRcon";

/// Command sent once the link opens to prime the session
pub const STATUS_COMMAND: &str = "status";

/// A single WebRcon frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Packet {
    #[serde(default)]
    pub identifier: i32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Packet {
    /// Create an operator command packet
    pub fn command(message: impl Into<String>) -> Self {
        Self {
            identifier: COMMAND_IDENTIFIER,
            message: Some(message.into()),
            name: Some(CLIENT_NAME.to_string()),
        }
    }

    /// Console text carried by this frame, if any
    pub fn console_text(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

/// Serialize a packet into a text frame
pub fn encode(packet: &Packet) -> Result<String> {
    serde_json::to_string(packet).map_err(Into::into)
}

/// Parse a text frame into a packet
pub fn decode(frame: &str) -> Result<Packet> {
    serde_json::from_str(frame)
        .map_err(|e| WrapperError::Serialization(format!("Error parsing RCON message: {}", e)))
}
