use std::time::Duration;
use thiserror::Error;

/// Ways a read session can fail.
///
/// None of these are retried internally; the caller decides whether to
/// start a fresh session, and no reassembly state survives a failed one.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The transport write failed or the link dropped mid-session.
    #[error("connection error: {0}")]
    Connection(anyhow::Error),

    /// No complete, CRC-valid response arrived within the deadline.
    #[error("incomplete response after {waited:?} ({buffered} bytes received)")]
    NotificationTimeout { waited: Duration, buffered: usize },

    /// A frame passed the length and CRC gate but its payload does not
    /// match the requested register count. Either the device produced a
    /// malformed response that happened to checksum correctly, or the
    /// catalogue handed to the decoder differs from the one the request
    /// was built from.
    #[error("response payload is {actual} bytes, expected {expected}")]
    DecodeLengthMismatch { expected: usize, actual: usize },
}
