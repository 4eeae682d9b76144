//! WebSocket transport for WebRcon
//!
//! The server accepts the password as the request path, so the endpoint is
//! `ws://host:port/password`. Only text frames carry console traffic; ping
//! and pong are answered by tungstenite itself.

use crate::transport::{CloseInfo, Connection, Connector, FrameSink, FrameSource, Inbound};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use rcon_wrapper_core::{Result, WrapperError};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket connections with `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &str) -> Result<Connection> {
        let (ws_stream, _response) = connect_async(endpoint)
            .await
            .map_err(|e| WrapperError::Transport(e.to_string()))?;

        let (sink, stream) = ws_stream.split();
        Ok((Box::new(WsSource(stream)), Box::new(WsSink(sink))))
    }
}

/// Read half of a WebSocket connection
struct WsSource(SplitStream<WsStream>);

#[async_trait]
impl FrameSource for WsSource {
    async fn next_frame(&mut self) -> Inbound {
        loop {
            match self.0.next().await {
                Some(Ok(WsMessage::Text(text))) => return Inbound::Text(text.to_string()),
                Some(Ok(WsMessage::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Inbound::Text(text),
                    Err(_) => debug!("Ignoring non-UTF-8 binary frame ({} bytes)", data.len()),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    let info = frame
                        .map(|f| CloseInfo {
                            code: Some(u16::from(f.code)),
                            reason: f.reason.to_string(),
                        })
                        .unwrap_or_default();
                    return Inbound::Closed(info);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("RCON socket error: {}", e);
                    return Inbound::Closed(CloseInfo {
                        code: None,
                        reason: e.to_string(),
                    });
                }
                None => return Inbound::Closed(CloseInfo::default()),
            }
        }
    }
}

/// Write half of a WebSocket connection
struct WsSink(SplitSink<WsStream, WsMessage>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.0
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| WrapperError::Transport(format!("RCON send failed: {}", e)))
    }
}
