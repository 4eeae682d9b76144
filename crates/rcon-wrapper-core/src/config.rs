//! Launch and connection configuration
//!
//! Everything here is resolved once at startup and never mutated afterwards.
//! Values come from the command line (the server executable and its
//! arguments) and from environment variables set by the hosting panel.

use crate::error::{Result, WrapperError};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the RCON host
pub const ENV_RCON_IP: &str = "RCON_IP";
/// Environment variable holding the RCON port
pub const ENV_RCON_PORT: &str = "RCON_PORT";
/// Environment variable holding the RCON password
pub const ENV_RCON_PASS: &str = "RCON_PASS";
/// Environment variable overriding the server working directory
pub const ENV_WORKDIR: &str = "WRAPPER_WORKDIR";
/// Environment variable overriding the console log path
pub const ENV_LOG_FILE: &str = "WRAPPER_LOG_FILE";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_WORKDIR: &str = "/home/container";
const DEFAULT_LOG_FILE: &str = "latest.log";
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// What to launch and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Path to the server executable
    pub executable: String,
    /// Arguments passed to the executable, in order
    pub arguments: Vec<String>,
    /// Working directory of the child process
    pub working_directory: PathBuf,
}

impl LaunchSpec {
    /// Build a launch spec from the wrapper's own arguments (program name
    /// already stripped). The first entry is the executable, the rest are
    /// its arguments.
    pub fn from_args<I>(args: I, working_directory: impl Into<PathBuf>) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let executable = args.next().ok_or(WrapperError::MissingCommand)?;

        Ok(Self {
            executable,
            arguments: args.collect(),
            working_directory: working_directory.into(),
        })
    }

    /// Human-readable command line, used for the startup banner
    pub fn command_line(&self) -> String {
        if self.arguments.is_empty() {
            return self.executable.clone();
        }
        format!("{} {}", self.executable, self.arguments.join(" "))
    }
}

/// RCON endpoint parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Host name or address of the RCON listener
    pub host: String,
    /// RCON port
    pub port: u16,
    /// RCON password, embedded in the connection address
    pub password: String,
}

impl ConnectionParams {
    /// Create params for an explicit endpoint
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
        }
    }

    /// Read `RCON_IP`, `RCON_PORT` and `RCON_PASS` from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve params through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(ENV_RCON_IP)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = lookup(ENV_RCON_PORT)
            .ok_or_else(|| WrapperError::Config(format!("{} is not set", ENV_RCON_PORT)))?;
        let port = port.trim().parse::<u16>().map_err(|e| {
            WrapperError::Config(format!("{} must be a port number ({}): {}", ENV_RCON_PORT, port, e))
        })?;

        let password = lookup(ENV_RCON_PASS)
            .ok_or_else(|| WrapperError::Config(format!("{} is not set", ENV_RCON_PASS)))?;

        Ok(Self {
            host,
            port,
            password,
        })
    }

    /// WebSocket address of the RCON endpoint. The password is the path.
    pub fn endpoint_url(&self) -> String {
        format!("ws://{}:{}/{}", self.host, self.port, self.password)
    }
}

/// Wrapper-level settings
#[derive(Debug, Clone)]
pub struct WrapperConfig {
    /// Working directory for the server process
    pub working_directory: PathBuf,
    /// Console log written from RCON messages
    pub log_path: PathBuf,
    /// Delay between RCON connection attempts
    pub retry_delay: Duration,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from(DEFAULT_WORKDIR),
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            retry_delay: RETRY_DELAY,
        }
    }
}

impl WrapperConfig {
    /// Apply `WRAPPER_WORKDIR` and `WRAPPER_LOG_FILE` overrides
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            working_directory: lookup(ENV_WORKDIR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.working_directory),
            log_path: lookup(ENV_LOG_FILE)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.log_path),
            retry_delay: defaults.retry_delay,
        }
    }
}
