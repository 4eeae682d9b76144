//! rcon-wrapper: game server launcher with WebRcon console bridging
//!
//! Usage: `rcon-wrapper <executable> [args...]`
//!
//! - Starts the server executable in `WRAPPER_WORKDIR` with its output on
//!   this terminal
//! - Connects to WebRcon at `ws://RCON_IP:RCON_PORT/RCON_PASS`, retrying
//!   every 5 seconds until the server accepts
//! - Forwards typed commands to RCON once connected and records server
//!   console lines in `WRAPPER_LOG_FILE`

use anyhow::Result;
use rcon_wrapper_core::{ConnectionParams, LaunchSpec, WrapperConfig};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use webrcon::{LogFile, RconClient, WebSocketConnector};
use wrapper_supervisor::{ChildSupervisor, Console, Session, spawn_termination_listener};

/// Capacity of the link event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the server console
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = WrapperConfig::from_env();
    let launch = LaunchSpec::from_args(std::env::args().skip(1), &config.working_directory)?;
    let params = ConnectionParams::from_env()?;
    let log = LogFile::create(&config.log_path).await?;

    let mut console = Console::stdout();
    console.local("Starting Rust...");
    console.local(&format!("Attempting to execute: {}", launch.command_line()));

    let child = ChildSupervisor::start(&launch)?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let link = RconClient::new(
        WebSocketConnector,
        &params,
        config.retry_delay,
        log,
        events_tx,
    )
    .spawn();

    let (signals_tx, signals_rx) = mpsc::channel(4);
    let signals = spawn_termination_listener(signals_tx);

    let mut session = Session::new(child, console, link.commands());
    let code = session
        .run(BufReader::new(tokio::io::stdin()), events_rx, signals_rx)
        .await;

    link.shutdown();
    signals.abort();
    info!("Wrapper exiting with status {}", code);

    // A pending stdin read would block runtime shutdown
    std::process::exit(code);
}
