//! Reconnecting WebRcon client
//!
//! The link moves `Connecting -> Open -> Closed`. While connecting, every
//! failure schedules another attempt after a fixed delay, forever. Once the
//! link has been open, a close is final: the remote server went away and the
//! wrapper should go with it.
//!
//! The client runs as its own task and reports to the session through
//! [`LinkEvent`]s. Commands come in over a channel held by [`LinkHandle`].

use crate::log_file::LogFile;
use crate::protocol::{self, Packet, STATUS_COMMAND};
use crate::transport::{CloseInfo, Connection, Connector, FrameSink, Inbound};
use rcon_wrapper_core::{ConnectionParams, Result, WrapperError};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Capacity of the command channel
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Link state of the RCON client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No successful handshake yet; failures are retried
    Connecting,
    /// Handshake completed
    Open,
    /// Closed after having been open. Terminal.
    Closed,
}

/// Notifications from the client to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A connection attempt failed and another is scheduled
    Waiting {
        error: String,
        retry_in: Duration,
    },
    /// The link is open and commands can be forwarded
    Open,
    /// Console text received from the server
    Message(String),
    /// The open link was closed by the peer
    Closed(CloseInfo),
}

/// What to do after the transport reports a close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterClose {
    Retry,
    Terminate,
}

/// WebRcon client state machine and I/O driver
pub struct RconClient<C, W> {
    connector: C,
    endpoint: String,
    retry_delay: Duration,
    state: LinkState,
    log: LogFile<W>,
    events: mpsc::Sender<LinkEvent>,
}

impl<C, W> RconClient<C, W>
where
    C: Connector,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a client for `params`. Nothing is connected until [`run`](Self::run).
    pub fn new(
        connector: C,
        params: &ConnectionParams,
        retry_delay: Duration,
        log: LogFile<W>,
        events: mpsc::Sender<LinkEvent>,
    ) -> Self {
        Self {
            connector,
            endpoint: params.endpoint_url(),
            retry_delay,
            state: LinkState::Connecting,
            log,
            events,
        }
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Drive the link until it closes after having been open, or until the
    /// command channel is dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<String>) -> LinkState {
        'link: loop {
            let (mut source, mut sink) = self.connect().await;
            self.on_open(sink.as_mut()).await;

            loop {
                tokio::select! {
                    command = commands.recv() => match command {
                        Some(command) => {
                            if let Err(e) = self.send(sink.as_mut(), &command).await {
                                warn!("Failed to forward command {:?}: {}", command, e);
                            }
                        }
                        None => {
                            debug!("Command channel closed, RCON client exiting");
                            break 'link;
                        }
                    },
                    inbound = source.next_frame() => match inbound {
                        Inbound::Text(frame) => self.on_message(&frame).await,
                        Inbound::Closed(info) => match self.on_close(info).await {
                            AfterClose::Terminate => break 'link,
                            AfterClose::Retry => {
                                sleep(self.retry_delay).await;
                                continue 'link;
                            }
                        },
                    },
                }
            }
        }

        self.state
    }

    /// Attempt connections until one succeeds
    async fn connect(&mut self) -> Connection {
        loop {
            self.state = LinkState::Connecting;
            debug!("Connecting to RCON at {}", self.endpoint);

            match self.connector.connect(&self.endpoint).await {
                Ok(connection) => return connection,
                Err(e) => {
                    self.on_error(&e).await;
                    sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn on_open(&mut self, sink: &mut dyn FrameSink) {
        self.state = LinkState::Open;
        info!("RCON link open");

        if let Err(e) = self.send(sink, STATUS_COMMAND).await {
            warn!("Failed to send status command: {}", e);
        }
        self.emit(LinkEvent::Open).await;
    }

    /// Encode `command` as an operator packet and write it to the link
    pub async fn send(&mut self, sink: &mut dyn FrameSink, command: &str) -> Result<()> {
        if self.state != LinkState::Open {
            return Err(WrapperError::Transport("RCON link is not open".into()));
        }

        let frame = protocol::encode(&Packet::command(command))?;
        debug!("[Wrapper→RCON] {}", frame);
        sink.send_text(frame).await
    }

    async fn on_message(&mut self, frame: &str) {
        let packet = match protocol::decode(frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("{} (frame: {:?})", e, frame);
                return;
            }
        };

        let Some(text) = packet.console_text() else {
            return;
        };

        self.emit(LinkEvent::Message(text.to_string())).await;
        if let Err(e) = self.log.append(text).await {
            warn!("Failed to append to console log: {}", e);
        }
    }

    async fn on_error(&mut self, error: &WrapperError) {
        if self.state != LinkState::Connecting {
            debug!("RCON error after open, waiting for close: {}", error);
            return;
        }

        self.emit(LinkEvent::Waiting {
            error: error.to_string(),
            retry_in: self.retry_delay,
        })
        .await;
    }

    async fn on_close(&mut self, info: CloseInfo) -> AfterClose {
        if self.state == LinkState::Connecting {
            let error = WrapperError::Transport(format!("closed while connecting ({})", info));
            self.on_error(&error).await;
            return AfterClose::Retry;
        }

        self.state = LinkState::Closed;
        info!("RCON link closed: {}", info);
        self.emit(LinkEvent::Closed(info)).await;
        AfterClose::Terminate
    }

    async fn emit(&mut self, event: LinkEvent) {
        // The session may already be gone during shutdown
        if self.events.send(event).await.is_err() {
            debug!("Link event dropped, session receiver closed");
        }
    }
}

impl<C, W> RconClient<C, W>
where
    C: Connector + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Run the client on its own task
    pub fn spawn(self) -> LinkHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let task = tokio::spawn(self.run(commands_rx));
        LinkHandle {
            commands: commands_tx,
            task,
        }
    }
}

/// Handle to a running client task
///
/// Dropping the handle aborts the task, including a pending retry delay.
pub struct LinkHandle {
    commands: mpsc::Sender<String>,
    task: JoinHandle<LinkState>,
}

impl LinkHandle {
    /// Sender for commands to forward once the link is open
    pub fn commands(&self) -> mpsc::Sender<String> {
        self.commands.clone()
    }

    /// Cancel the client task
    pub fn shutdown(&self) {
        self.task.abort();
    }

    /// Whether the client task has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for LinkHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FrameSource;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    struct ChannelSource(mpsc::UnboundedReceiver<Inbound>);

    #[async_trait]
    impl FrameSource for ChannelSource {
        async fn next_frame(&mut self) -> Inbound {
            self.0
                .recv()
                .await
                .unwrap_or_else(|| Inbound::Closed(CloseInfo::default()))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_text(&mut self, text: String) -> Result<()> {
            self.0.lock().unwrap().push(text);
            Ok(())
        }
    }

    /// Connector that plays back a fixed list of outcomes and records when
    /// each attempt happened
    #[derive(Default)]
    struct ScriptedConnector {
        outcomes: Mutex<VecDeque<Result<Connection>>>,
        attempts: Arc<Mutex<Vec<Instant>>>,
    }

    impl ScriptedConnector {
        fn fail(self, times: usize) -> Self {
            {
                let mut outcomes = self.outcomes.lock().unwrap();
                for _ in 0..times {
                    outcomes.push_back(Err(WrapperError::Transport(
                        "Connection refused (os error 111)".into(),
                    )));
                }
            }
            self
        }

        fn succeed(self, source: ChannelSource, sink: RecordingSink) -> Self {
            self.outcomes
                .lock()
                .unwrap()
                .push_back(Ok((Box::new(source), Box::new(sink))));
            self
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self, _endpoint: &str) -> Result<Connection> {
            self.attempts.lock().unwrap().push(Instant::now());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(WrapperError::Transport("no more outcomes".into())))
        }
    }

    fn params() -> ConnectionParams {
        ConnectionParams::new("localhost", 28016, "secret")
    }

    fn idle_client(
        state: LinkState,
    ) -> (
        RconClient<ScriptedConnector, Vec<u8>>,
        mpsc::Receiver<LinkEvent>,
    ) {
        let (events_tx, events_rx) = mpsc::channel(16);
        let mut client = RconClient::new(
            ScriptedConnector::default(),
            &params(),
            Duration::from_secs(5),
            LogFile::from_writer(Vec::new()),
            events_tx,
        );
        client.state = state;
        (client, events_rx)
    }

    #[test]
    fn test_new_client_is_connecting() {
        let (client, _events) = idle_client(LinkState::Connecting);
        assert_eq!(client.state(), LinkState::Connecting);
        assert_eq!(client.endpoint, "ws://localhost:28016/secret");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_open() {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let sink = RecordingSink::default();
        let connector = ScriptedConnector::default()
            .fail(2)
            .succeed(ChannelSource(frames_rx), sink.clone());
        let attempts = connector.attempts.clone();

        let (events_tx, mut events_rx) = mpsc::channel(16);
        let client = RconClient::new(
            connector,
            &params(),
            Duration::from_secs(5),
            LogFile::from_writer(Vec::new()),
            events_tx,
        );
        let (_commands_tx, commands_rx) = mpsc::channel(4);
        let task = tokio::spawn(client.run(commands_rx));

        for _ in 0..2 {
            match events_rx.recv().await.unwrap() {
                LinkEvent::Waiting { error, retry_in } => {
                    assert!(error.contains("Connection refused"));
                    assert_eq!(retry_in, Duration::from_secs(5));
                }
                other => panic!("expected Waiting, got {:?}", other),
            }
        }
        assert_eq!(events_rx.recv().await.unwrap(), LinkEvent::Open);

        let attempts = attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[1] - attempts[0], Duration::from_secs(5));
        assert_eq!(attempts[2] - attempts[1], Duration::from_secs(5));

        // Status is primed before anything else
        let sent = sink.0.lock().unwrap().clone();
        assert_eq!(sent, vec![r#"{"Identifier":-1,"Message":"status","Name":"WebRcon"}"#]);

        frames_tx
            .send(Inbound::Closed(CloseInfo {
                code: Some(1000),
                reason: "bye".into(),
            }))
            .unwrap();
        assert_eq!(
            events_rx.recv().await.unwrap(),
            LinkEvent::Closed(CloseInfo {
                code: Some(1000),
                reason: "bye".into()
            })
        );
        assert_eq!(task.await.unwrap(), LinkState::Closed);
    }

    #[tokio::test]
    async fn test_forwards_commands_as_packets() {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let sink = RecordingSink::default();
        let connector = ScriptedConnector::default().succeed(ChannelSource(frames_rx), sink.clone());

        let (events_tx, mut events_rx) = mpsc::channel(16);
        let handle = RconClient::new(
            connector,
            &params(),
            Duration::from_secs(5),
            LogFile::from_writer(Vec::new()),
            events_tx,
        )
        .spawn();

        assert_eq!(events_rx.recv().await.unwrap(), LinkEvent::Open);
        handle.commands().send("say hello".to_string()).await.unwrap();

        frames_tx
            .send(Inbound::Text(r#"{"Message":"[CHAT] SERVER: hello"}"#.into()))
            .unwrap();
        assert_eq!(
            events_rx.recv().await.unwrap(),
            LinkEvent::Message("[CHAT] SERVER: hello".into())
        );

        for _ in 0..100 {
            if sink.0.lock().unwrap().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        let sent = sink.0.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        let forwarded = protocol::decode(&sent[1]).unwrap();
        assert_eq!(forwarded, Packet::command("say hello"));
    }

    #[tokio::test]
    async fn test_message_appended_to_log() {
        let (mut client, mut events) = idle_client(LinkState::Open);

        client.on_message(r#"{"Message":"Server saved","Identifier":0}"#).await;

        assert_eq!(
            events.recv().await.unwrap(),
            LinkEvent::Message("Server saved".into())
        );
        assert_eq!(client.log.get_ref().as_slice(), b"\nServer saved");
    }

    #[tokio::test]
    async fn test_empty_message_is_discarded() {
        let (mut client, mut events) = idle_client(LinkState::Open);

        client.on_message(r#"{"Message":""}"#).await;
        client.on_message(r#"{"Identifier":3}"#).await;

        assert!(events.try_recv().is_err());
        assert!(client.log.get_ref().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_link_open() {
        let (mut client, mut events) = idle_client(LinkState::Open);

        client.on_message("{\"Message\": ").await;

        assert_eq!(client.state(), LinkState::Open);
        assert!(events.try_recv().is_err());
        assert!(client.log.get_ref().is_empty());
    }

    #[tokio::test]
    async fn test_close_after_open_terminates() {
        let (mut client, mut events) = idle_client(LinkState::Open);

        let next = client.on_close(CloseInfo::default()).await;

        assert_eq!(next, AfterClose::Terminate);
        assert_eq!(client.state(), LinkState::Closed);
        assert_eq!(
            events.recv().await.unwrap(),
            LinkEvent::Closed(CloseInfo::default())
        );
        assert!(client.log.get_ref().is_empty());
    }

    #[tokio::test]
    async fn test_close_while_connecting_retries() {
        let (mut client, mut events) = idle_client(LinkState::Connecting);

        let next = client
            .on_close(CloseInfo {
                code: Some(1006),
                reason: String::new(),
            })
            .await;

        assert_eq!(next, AfterClose::Retry);
        assert_eq!(client.state(), LinkState::Connecting);
        assert!(matches!(
            events.recv().await.unwrap(),
            LinkEvent::Waiting { .. }
        ));
    }

    #[tokio::test]
    async fn test_error_after_open_is_ignored() {
        let (mut client, mut events) = idle_client(LinkState::Open);

        client
            .on_error(&WrapperError::Transport("reset".into()))
            .await;

        assert_eq!(client.state(), LinkState::Open);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_requires_open_link() {
        let (mut client, _events) = idle_client(LinkState::Connecting);
        let mut sink = RecordingSink::default();

        assert!(client.send(&mut sink, "status").await.is_err());
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_retry() {
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let handle = RconClient::new(
            ScriptedConnector::default().fail(1),
            &params(),
            Duration::from_secs(5),
            LogFile::from_writer(Vec::new()),
            events_tx,
        )
        .spawn();

        assert!(matches!(
            events_rx.recv().await.unwrap(),
            LinkEvent::Waiting { .. }
        ));
        handle.shutdown();

        for _ in 0..10 {
            if handle.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(handle.is_finished());
        assert!(handle.commands().send("status".into()).await.is_err());
    }
}
