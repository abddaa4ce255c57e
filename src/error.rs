//! Error types for sphero-link.
//!
//! Framing corruption never shows up here: the assembler discards bad frames
//! and resynchronizes on its own. What remains are transport failures and
//! configuration problems.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all sphero-link operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// I/O error from an underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-specific failure (write rejected, notify failed, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation requires a connected transport.
    #[error("Transport not connected")]
    NotConnected,

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No peripheral matched the discovery filter in time.
    #[error("No device matching '{filter}' found within {timeout:?}")]
    DeviceNotFound {
        /// Name filter that was searched for.
        filter: String,
        /// How long discovery ran.
        timeout: Duration,
    },

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using LinkError.
pub type Result<T> = std::result::Result<T, LinkError>;
