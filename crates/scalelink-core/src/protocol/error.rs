//! Protocol errors

use std::io;
use thiserror::Error;

/// Errors that can occur while talking to a scale
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Open, write or read failure on the link
    #[error("Connection error: {0}")]
    Connection(String),

    /// No byte arrived within the read timeout
    #[error("Connection timeout")]
    Timeout,

    /// Frame payload matched neither the weight nor the status form
    #[error("Invalid payload {payload:02x?}: {reason}")]
    Parse {
        /// Raw payload bytes between STX and CR
        payload: Vec<u8>,
        /// What did not match
        reason: String,
    },

    /// An open frame grew past the size limit without a terminator
    #[error("Frame overflow: no CR within {limit} bytes")]
    FrameOverflow {
        /// Maximum accepted payload length
        limit: usize,
    },
}

impl ProtocolError {
    /// Build a parse error for the given payload
    pub fn parse(payload: &[u8], reason: impl Into<String>) -> Self {
        Self::Parse {
            payload: payload.to_vec(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the link is gone and must be reopened.
    ///
    /// Parse and overflow errors are line noise; the link stays usable.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout)
    }
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            _ => Self::Connection(err.to_string()),
        }
    }
}

impl From<serialport::Error> for ProtocolError {
    fn from(err: serialport::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_timeout_maps_to_timeout() {
        let err: ProtocolError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(err, ProtocolError::Timeout));
        assert!(err.is_connection_loss());
    }

    #[test]
    fn test_io_failure_maps_to_connection() {
        let err: ProtocolError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, ProtocolError::Connection(_)));
        assert!(err.is_connection_loss());
    }

    #[test]
    fn test_parse_error_is_not_connection_loss() {
        let err = ProtocolError::parse(b"abc", "no match");
        assert!(!err.is_connection_loss());
        assert!(err.to_string().contains("[61, 62, 63]"));
    }
}
