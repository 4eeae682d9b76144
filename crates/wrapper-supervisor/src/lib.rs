//! # wrapper-supervisor
//!
//! Runs the game server as a child process and bridges the operator's
//! console to it:
//! - `child`: spawn, wait and SIGTERM forwarding
//! - `router`: stdin handling before and after the RCON link opens
//! - `console`: operator output with duplicate progress-line suppression
//! - `session`: the control loop tying child, input, link and signals together

pub mod child;
pub mod console;
pub mod filter;
pub mod router;
pub mod session;
pub mod signals;

pub use child::{ChildProcess, ChildSupervisor, ExitOutcome};
pub use console::Console;
pub use filter::DuplicateSuppressor;
pub use router::{InputMode, InputRouter, RouteAction};
pub use session::{Flow, Session, SupervisorState};
pub use signals::spawn_termination_listener;
