//! Backflow Error Types
//!
//! Flush failures are never returned from `write`/`end`/`close`; they are
//! delivered as [`BufferEvent::Error`](crate::monitor::BufferEvent::Error).
//! [`BufferError`] only covers misuse that can be reported synchronously.

use std::fmt;
use std::io;
use std::panic::Location;
use thiserror::Error;

/// Platform diagnostic captured during a single sink write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: io::ErrorKind,
    pub message: String,
    /// Where the diagnostic was raised, when the sink knows it.
    pub location: Option<&'static Location<'static>>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: io::ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Capture an `io::Error` together with the caller's location.
    #[track_caller]
    #[must_use]
    pub fn from_io(err: &io::Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            location: Some(Location::caller()),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{} (at {}:{})", self.message, loc.file(), loc.line()),
            None => f.write_str(&self.message),
        }
    }
}

/// Failure reported by a [`Sink`](crate::sink::Sink) write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The platform signaled a diagnostic during the write
    #[error("{0}")]
    Io(Diagnostic),

    /// The write failed without any detail
    #[error("Send failed")]
    Rejected,
}

/// Failure of a flush attempt, carried by the `error` event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The sink handle was no longer usable when the flush started
    #[error("Tried to write to invalid stream")]
    InvalidSink,

    /// The platform write signaled a diagnostic (e.g. broken pipe)
    #[error("Write error: {0}")]
    LowLevel(Diagnostic),

    /// The write returned an explicit failure with no diagnostic
    #[error("Send failed")]
    Rejected,
}

impl From<SinkError> for WriteError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Io(diag) => Self::LowLevel(diag),
            SinkError::Rejected => Self::Rejected,
        }
    }
}

impl WriteError {
    /// Diagnostic attached to a low-level failure.
    #[must_use]
    pub const fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::LowLevel(diag) => Some(diag),
            _ => None,
        }
    }

    /// Check if a later readiness notification may succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::LowLevel(diag) => matches!(
                diag.kind,
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            Self::InvalidSink | Self::Rejected => false,
        }
    }

    /// Check if the peer side of the sink is gone
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::InvalidSink => true,
            Self::LowLevel(diag) => matches!(
                diag.kind,
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
            ),
            Self::Rejected => false,
        }
    }
}

/// Errors reported synchronously by the buffer API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Options failed validation
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl BufferError {
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }
}

/// Result type alias for Backflow operations
pub type Result<T> = std::result::Result<T, BufferError>;
