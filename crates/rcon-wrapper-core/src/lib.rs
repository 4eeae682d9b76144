//! # rcon-wrapper-core
//!
//! Shared types for the RCON server wrapper:
//! - Error type and `Result` alias
//! - Launch specification for the supervised server
//! - RCON connection parameters and wrapper settings from the environment

pub mod config;
pub mod error;

pub use config::{ConnectionParams, LaunchSpec, WrapperConfig};
pub use error::{Result, WrapperError};
