//! Error handling for pendantlink
//!
//! Provides error types for all layers of the bridge:
//! - Connection errors (port enumeration and opening)
//! - Bridge errors (the session failure taxonomy)
//!
//! All error types use `thiserror` for ergonomic error handling.
//! Nothing here is fatal to the host process: every bridge error degrades
//! to "not connected" and discovery is retried.

use thiserror::Error;

/// Connection error type
///
/// Represents errors related to enumerating and opening serial ports.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Port enumeration failed
    #[error("Failed to enumerate ports: {reason}")]
    EnumerationFailed {
        /// The reason enumeration failed.
        reason: String,
    },

    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Baud rate not supported
    #[error("Baud rate {baud} not supported")]
    UnsupportedBaudRate {
        /// The unsupported baud rate.
        baud: u32,
    },
}

/// Bridge error type
///
/// The failure taxonomy of a pendant session. Scan-time errors skip the
/// current port; session-time errors force a disconnect and a new scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Port could not be opened
    #[error("Port {port} unavailable: {reason}")]
    PortUnavailable {
        /// The port name.
        port: String,
        /// Why it could not be opened.
        reason: String,
    },

    /// Peer did not identify itself within the handshake window
    #[error("No handshake on {port} within {window_ms}ms")]
    HandshakeTimeout {
        /// The port name.
        port: String,
        /// The handshake window in milliseconds.
        window_ms: u64,
    },

    /// A `KEY:` line without a valid integer
    #[error("Malformed command: {line}")]
    MalformedCommand {
        /// The offending line.
        line: String,
    },

    /// No liveness signal within the threshold
    #[error("Link timed out after {elapsed_ms}ms without a liveness signal")]
    LinkTimeout {
        /// Time since the last liveness signal.
        elapsed_ms: u64,
    },

    /// Read or write failed on the active port
    #[error("I/O failure: {reason}")]
    IoFailure {
        /// The underlying error message.
        reason: String,
    },

    /// Backend or jog service not registered yet
    #[error("{service} not available")]
    CollaboratorUnavailable {
        /// The missing service.
        service: &'static str,
    },
}

impl BridgeError {
    /// Check if this error only disqualifies the current scan candidate
    pub fn is_port_skip(&self) -> bool {
        matches!(
            self,
            BridgeError::PortUnavailable { .. } | BridgeError::HandshakeTimeout { .. }
        )
    }

    /// Check if this error ends an established session
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            BridgeError::LinkTimeout { .. } | BridgeError::IoFailure { .. }
        )
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::IoFailure {
            reason: err.to_string(),
        }
    }
}

/// Main error type for pendantlink
///
/// Errors surfaced by the public setup APIs: port enumeration and starting
/// the session worker. Failures inside a running session are `BridgeError`s
/// and never leave the supervisor.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
