//! Error types for Stratum v1 protocol.

use thiserror::Error;

/// Stratum protocol errors.
#[derive(Error, Debug)]
pub enum StratumError {
    /// Network I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A received line could not be parsed as a JSON-RPC message
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Pool sent a message whose payload violates the protocol
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A single frame exceeded the receive buffer limit
    #[error("Line exceeds {0} bytes without a newline")]
    LineTooLong(usize),

    /// Connection error
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Subscribe response unusable; the session cannot continue
    #[error("Subscribe failed: {0}")]
    SubscriptionFailed(String),

    /// Pool refused our credentials
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Connection lost
    #[error("Connection lost")]
    Disconnected,
}

impl StratumError {
    /// Whether the session can go on after this error.
    ///
    /// Unparseable lines and malformed payloads are reported and skipped.
    /// A failed subscribe or authorize leaves the session stalled until the
    /// next connection, and everything else tears the connection down.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StratumError::InvalidMessage(_) | StratumError::ProtocolViolation(_)
        )
    }
}

/// Convenient Result type for Stratum operations.
pub type StratumResult<T> = Result<T, StratumError>;
