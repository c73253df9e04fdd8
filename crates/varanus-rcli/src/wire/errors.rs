//! Error types for frame encoding and decoding.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors surfaced while reading or writing protocol frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// A length prefix was negative.
    #[error("received invalid string length {length}")]
    NegativeLength {
        /// Decoded length value.
        length: i32,
    },
    /// A string exceeded the frame size limit.
    #[error("string length {length} exceeds the {max} byte limit")]
    StringTooLong {
        /// Offending length in bytes.
        length: usize,
        /// Configured maximum.
        max: usize,
    },
    /// The command type byte is not part of the protocol.
    #[error("received invalid command type {code}")]
    UnknownCommandType {
        /// Received type byte.
        code: u8,
    },
    /// The result code is not valid for the echoed command type.
    #[error("received invalid result code {code} for command type {kind}")]
    UnknownResultCode {
        /// Echoed command type byte.
        kind: u8,
        /// Received result code.
        code: u8,
    },
    /// An in-memory buffer ended before the frame was complete.
    #[error("frame truncated: needed {needed} bytes but only {available} remain")]
    Truncated {
        /// Bytes requested by the decoder.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
    /// A result string was not valid UTF-8.
    #[error("result string is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] FromUtf8Error),
    /// The peer closed the connection while more bytes were expected.
    #[error("remote side terminated the connection")]
    PeerClosed,
    /// The socket failed with a non-transient error.
    #[error("socket I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// Returns `true` when the peer closed the connection.
    ///
    /// The serve loop treats this as a normal end of session rather than a
    /// failure.
    #[must_use]
    pub const fn is_peer_closed(&self) -> bool {
        matches!(self, Self::PeerClosed)
    }

    /// Returns `true` when the peer sent bytes that violate the protocol.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::NegativeLength { .. }
                | Self::StringTooLong { .. }
                | Self::UnknownCommandType { .. }
                | Self::UnknownResultCode { .. }
                | Self::InvalidUtf8(_)
        )
    }
}
