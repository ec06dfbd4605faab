//! Error types for the webterm client.

use thiserror::Error;

/// Main error type for webterm operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid terminal dimensions (either axis below the 2x2 floor)
    #[error("Invalid dimensions: {cols}x{rows}")]
    InvalidDimensions {
        /// Number of columns
        cols: u16,
        /// Number of rows
        rows: u16,
    },

    /// Endpoint URL could not be built or parsed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Socket could not be opened or written
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation needs an open connection
    #[error("Not connected")]
    NotConnected,

    /// Download request failed or returned a non-2xx status
    #[error("Download failed ({status}): {message}")]
    Download {
        /// HTTP status code, 0 when no response was received
        status: u16,
        /// Response body text or transport error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
