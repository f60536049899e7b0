// ABOUTME: Modem client error types covering transport, protocol and initialization failures
// ABOUTME: Separates fatal connection errors from per-command failures that leave the modem usable

use std::io;
use thiserror::Error;

/// Error type for modem operations
///
/// Transport failures and initialization failures end the connection; every
/// other variant is scoped to the command that produced it and the modem
/// stays usable afterwards.
#[derive(Debug, Error)]
pub enum ModemError {
    /// I/O error while reading from or writing to the stream
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// The protocol engine has stopped (stream closed, read error or shutdown)
    #[error("Connection closed")]
    ConnectionClosed,

    /// No reply arrived within the configured read timeout
    #[error("Timed out waiting for response to {command}")]
    Timeout { command: String },

    /// The modem answered `ERROR`
    #[error("Response to {command} was ERROR")]
    Rejected { command: String },

    /// The modem answered with a response that could not be decoded
    #[error("Malformed response to {command}")]
    MalformedResponse { command: String },

    /// A reply of the wrong kind arrived (e.g. no body prompt before a send)
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedPacket {
        expected: &'static str,
        actual: String,
    },

    /// The requested storage slot is empty
    #[error("Message {index} not found")]
    NotFound { index: u32 },

    /// The initialization handshake could not bring the modem to a known state
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Caller-supplied data that cannot be expressed on the wire
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ModemError {
    /// True if the connection is unusable after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ModemError::Connection(_) | ModemError::ConnectionClosed | ModemError::InitFailed(_)
        )
    }
}

/// Result type alias for modem operations
pub type ModemResult<T> = Result<T, ModemError>;
