//! Duplicate progress-line suppression
//!
//! The server prints the same asset loading percentage many times while it
//! boots. Only the first line for each percentage is worth showing.

use std::collections::HashSet;

/// Prefix of the progress lines that get de-duplicated
pub const PROGRESS_PREFIX: &str = "Loading Prefab Bundle ";

/// Remembers which progress tokens were already shown
#[derive(Debug, Default)]
pub struct DuplicateSuppressor {
    seen: HashSet<String>,
}

impl DuplicateSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `line` should be shown. Lines without the progress prefix
    /// always pass.
    pub fn should_emit(&mut self, line: &str) -> bool {
        match line.strip_prefix(PROGRESS_PREFIX) {
            Some(key) => self.seen.insert(key.to_string()),
            None => true,
        }
    }
}
