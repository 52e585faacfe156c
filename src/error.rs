//! Error types for window capture.

use thiserror::Error;

/// Errors reported to the caller of a capture session.
///
/// OS failures inside the periodic capture cycle never reach the caller; they
/// are logged and the cycle continues. Only construction and lifecycle misuse
/// surface here.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Frame rate must be greater than zero, got {0}")]
    InvalidFrameRate(u32),

    #[error("Invalid title pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Capture session is already running")]
    AlreadyRunning,

    #[error("Capture session is closed; create a new session instead")]
    SessionClosed,

    #[error("Failed to spawn capture worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("{call} failed: {message}")]
    Platform { call: &'static str, message: String },
}

impl CaptureError {
    pub fn platform(call: &'static str, message: impl Into<String>) -> Self {
        Self::Platform {
            call,
            message: message.into(),
        }
    }
}

/// Result type alias for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;
