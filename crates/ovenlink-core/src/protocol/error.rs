//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("already opened")]
    AlreadyOpen,

    #[error("port not open")]
    NotOpen,

    #[error("error opening port: {0}")]
    OpenFailed(String),

    #[error("error closing port: {0}")]
    CloseFailed(String),

    #[error("read timed out")]
    Timeout,

    #[error("transport error: {0}")]
    TransportFault(String),

    #[error("empty response")]
    EmptyResponse,

    #[error("checksum error: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("operation setting failed: expected '{expected}', got '{actual}'")]
    AcknowledgementMismatch { expected: String, actual: String },

    #[error("invalid {field}: '{value}'")]
    InvalidField { field: &'static str, value: String },
}

/// Coarse classification of a [`ProtocolError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The line could not be opened or closed, or is not open
    PortUnavailable,
    /// Write or read-line failed, including timeouts
    TransportFault,
    /// Received FCS disagrees with the computed one
    ChecksumMismatch,
    /// Echoed fields of an acknowledgement disagree with the request
    AcknowledgementMismatch,
    /// The controller answered with a zero-length line
    EmptyResponse,
    /// A caller-supplied field does not fit its wire width
    InvalidField,
}

impl ProtocolError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::AlreadyOpen
            | ProtocolError::NotOpen
            | ProtocolError::OpenFailed(_)
            | ProtocolError::CloseFailed(_) => ErrorKind::PortUnavailable,
            ProtocolError::Timeout | ProtocolError::TransportFault(_) => {
                ErrorKind::TransportFault
            }
            ProtocolError::EmptyResponse => ErrorKind::EmptyResponse,
            ProtocolError::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            ProtocolError::AcknowledgementMismatch { .. } => ErrorKind::AcknowledgementMismatch,
            ProtocolError::InvalidField { .. } => ErrorKind::InvalidField,
        }
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => ProtocolError::Timeout,
            _ => ProtocolError::TransportFault(e.to_string()),
        }
    }
}
