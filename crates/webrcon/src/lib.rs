//! WebRcon client for the server wrapper
//!
//! This crate provides:
//! - The JSON wire format used by WebRcon (`protocol`)
//! - Transport traits and a `tokio-tungstenite` WebSocket implementation
//! - The append-only console log
//! - A client that retries until the link opens and reports link events

pub mod client;
pub mod log_file;
pub mod protocol;
pub mod transport;
pub mod ws;

pub use client::{LinkEvent, LinkHandle, LinkState, RconClient};
pub use log_file::LogFile;
pub use protocol::{Packet, decode, encode};
pub use transport::{CloseInfo, Connection, Connector, FrameSink, FrameSource, Inbound};
pub use ws::WebSocketConnector;
