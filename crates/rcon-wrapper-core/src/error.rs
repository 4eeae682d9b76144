//! Error types for the RCON wrapper

use thiserror::Error;

/// Result type for wrapper operations
pub type Result<T> = std::result::Result<T, WrapperError>;

/// Wrapper error types
#[derive(Debug, Error)]
pub enum WrapperError {
    /// No executable was passed on the command line
    #[error("No startup command or arguments provided to the wrapper")]
    MissingCommand,

    /// Environment configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The child process could not be started
    #[error("Failed to start process: {0}")]
    Spawn(String),

    /// Error while controlling or waiting on the child process
    #[error("Process error: {0}")]
    Process(String),

    /// RCON transport failure (connect, send, receive)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Console log file could not be written
    #[error("Log file error: {0}")]
    LogFile(String),

    /// Standard stream I/O
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for WrapperError {
    fn from(err: serde_json::Error) -> Self {
        WrapperError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_command_message() {
        assert_eq!(
            WrapperError::MissingCommand.to_string(),
            "No startup command or arguments provided to the wrapper"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let err: WrapperError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, WrapperError::Serialization(_)));
    }
}
