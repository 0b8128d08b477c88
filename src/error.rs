//! Error types for the tracker crate

use thiserror::Error;

/// Result type alias for the tracker crate
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors raised while building a tracker.
///
/// Per-frame processing never fails; numerical trouble inside a frame is
/// recovered where it happens.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid tracker configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse tracker configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl TrackerError {
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
