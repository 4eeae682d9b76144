//! Console log written from RCON messages
//!
//! The file is truncated when the wrapper starts and afterwards only ever
//! appended to. Every message is written as `"\n" + message`.

use rcon_wrapper_core::{Result, WrapperError};
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Append-only console log
pub struct LogFile<W> {
    writer: W,
}

impl LogFile<File> {
    /// Truncate (or create) the file at `path` and open it for appending
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(|e| WrapperError::LogFile(format!("{}: {}", path.display(), e)))?;

        debug!("Console log truncated: {}", path.display());
        Ok(Self::from_writer(file))
    }
}

impl<W: AsyncWrite + Unpin + Send> LogFile<W> {
    /// Wrap an arbitrary writer
    pub fn from_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Borrow the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Append one console line
    pub async fn append(&mut self, message: &str) -> Result<()> {
        let entry = format!("\n{}", message);
        self.writer
            .write_all(entry.as_bytes())
            .await
            .map_err(|e| WrapperError::LogFile(format!("append failed: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| WrapperError::LogFile(format!("flush failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_prefixes_newline() {
        let mock = tokio_test::io::Builder::new()
            .write(b"\nServer saved")
            .build();
        let mut log = LogFile::from_writer(mock);

        log.append("Server saved").await.unwrap();
    }

    #[tokio::test]
    async fn test_create_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");
        std::fs::write(&path, "old session output").unwrap();

        let mut log = LogFile::create(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        log.append("first").await.unwrap();
        log.append("second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\nfirst\nsecond");
    }

    #[tokio::test]
    async fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("latest.log");

        let result = LogFile::create(&path).await;
        assert!(matches!(result, Err(WrapperError::LogFile(_))));
    }
}
