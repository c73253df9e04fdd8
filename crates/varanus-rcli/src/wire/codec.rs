//! Encoding and decoding of framing primitives.
//!
//! Decoding pulls bytes through a [`ByteSource`], so the same routines serve
//! in-memory buffers and live sockets wrapped in a shutdown-aware reader. A
//! source may abandon a read (for example when shutdown is requested), which
//! surfaces as `Ok(None)` all the way up to the caller.

use super::frame::{
    Command, CommandKind, EXPRESSION_EXCEPTION, EXPRESSION_NULL, EXPRESSION_VALUE,
    ExpressionOutcome, Reply, SHELL_ERROR, SHELL_OK, ShellOutcome,
};
use super::WireError;

/// Largest string accepted in a single frame.
pub const MAX_STRING_BYTES: usize = 16 * 1024 * 1024;

const LENGTH_PREFIX_BYTES: usize = 4;

/// Supplies exact byte counts to the frame decoder.
pub trait ByteSource {
    /// Returns exactly `len` bytes, or `None` when the read was abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::PeerClosed`] when the underlying stream ends
    /// early, or another [`WireError`] on I/O failure.
    fn read_bytes(&mut self, len: usize) -> Result<Option<Vec<u8>>, WireError>;
}

impl ByteSource for &[u8] {
    fn read_bytes(&mut self, len: usize) -> Result<Option<Vec<u8>>, WireError> {
        let Some((head, tail)) = self.split_at_checked(len) else {
            return Err(WireError::Truncated {
                needed: len,
                available: self.len(),
            });
        };
        *self = tail;
        Ok(Some(head.to_vec()))
    }
}

/// Appends a single byte.
pub fn encode_byte(buffer: &mut Vec<u8>, value: u8) {
    buffer.push(value);
}

/// Appends a length-prefixed string.
///
/// # Errors
///
/// Returns [`WireError::StringTooLong`] when the string exceeds
/// [`MAX_STRING_BYTES`].
#[expect(clippy::big_endian_bytes, reason = "length prefixes are big-endian on the wire")]
pub fn encode_string(buffer: &mut Vec<u8>, value: &[u8]) -> Result<(), WireError> {
    let length = checked_length(value.len())?;
    buffer.extend_from_slice(&length.to_be_bytes());
    buffer.extend_from_slice(value);
    Ok(())
}

fn checked_length(length: usize) -> Result<i32, WireError> {
    if length > MAX_STRING_BYTES {
        return Err(WireError::StringTooLong {
            length,
            max: MAX_STRING_BYTES,
        });
    }
    i32::try_from(length).map_err(|_| WireError::StringTooLong {
        length,
        max: MAX_STRING_BYTES,
    })
}

/// Reads a single byte.
///
/// # Errors
///
/// Propagates source failures.
pub fn decode_byte(source: &mut impl ByteSource) -> Result<Option<u8>, WireError> {
    Ok(source
        .read_bytes(1)?
        .and_then(|bytes| bytes.first().copied()))
}

/// Reads a length-prefixed string as raw bytes.
///
/// # Errors
///
/// Returns [`WireError::NegativeLength`] for a negative prefix and
/// [`WireError::StringTooLong`] for one above [`MAX_STRING_BYTES`].
#[expect(clippy::big_endian_bytes, reason = "length prefixes are big-endian on the wire")]
pub fn decode_string(source: &mut impl ByteSource) -> Result<Option<Vec<u8>>, WireError> {
    let Some(prefix) = source.read_bytes(LENGTH_PREFIX_BYTES)? else {
        return Ok(None);
    };
    let raw: [u8; LENGTH_PREFIX_BYTES] = prefix
        .as_slice()
        .try_into()
        .map_err(|_| WireError::Truncated {
            needed: LENGTH_PREFIX_BYTES,
            available: prefix.len(),
        })?;
    let length = i32::from_be_bytes(raw);
    let Ok(length) = usize::try_from(length) else {
        return Err(WireError::NegativeLength { length });
    };
    if length > MAX_STRING_BYTES {
        return Err(WireError::StringTooLong {
            length,
            max: MAX_STRING_BYTES,
        });
    }
    source.read_bytes(length)
}

fn decode_text(source: &mut impl ByteSource) -> Result<Option<String>, WireError> {
    decode_string(source)?
        .map(|bytes| String::from_utf8(bytes).map_err(WireError::InvalidUtf8))
        .transpose()
}

impl Command {
    /// Serialises the command as a command frame.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::StringTooLong`] for oversized payloads.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut buffer = Vec::with_capacity(1 + LENGTH_PREFIX_BYTES + self.payload().len());
        encode_byte(&mut buffer, self.kind().code());
        encode_string(&mut buffer, self.payload())?;
        Ok(buffer)
    }

    /// Reads one command frame.
    ///
    /// The type byte is validated before the payload is read, so an unknown
    /// type fails without consuming the rest of the frame.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for unknown types or invalid lengths, and
    /// propagates source failures.
    pub fn decode(source: &mut impl ByteSource) -> Result<Option<Self>, WireError> {
        let Some(code) = decode_byte(source)? else {
            return Ok(None);
        };
        let kind = CommandKind::from_code(code)?;
        let Some(payload) = decode_string(source)? else {
            return Ok(None);
        };
        Ok(Some(Self::new(kind, payload)))
    }
}

impl Reply {
    /// Serialises the reply as a result frame.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::StringTooLong`] for oversized payloads.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let payload = self.payload();
        let mut buffer =
            Vec::with_capacity(2 + payload.map_or(0, |text| LENGTH_PREFIX_BYTES + text.len()));
        encode_byte(&mut buffer, self.kind().code());
        encode_byte(&mut buffer, self.code());
        if let Some(text) = payload {
            encode_string(&mut buffer, text.as_bytes())?;
        }
        Ok(buffer)
    }

    /// Reads one result frame.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for unknown types or codes, and propagates
    /// source failures.
    pub fn decode(source: &mut impl ByteSource) -> Result<Option<Self>, WireError> {
        let Some(kind_code) = decode_byte(source)? else {
            return Ok(None);
        };
        let kind = CommandKind::from_code(kind_code)?;
        let Some(code) = decode_byte(source)? else {
            return Ok(None);
        };
        let reply = match (kind, code) {
            (CommandKind::Expression, EXPRESSION_NULL) => Self::Expression(ExpressionOutcome::Null),
            (CommandKind::Expression, EXPRESSION_VALUE) => match decode_text(source)? {
                Some(text) => Self::Expression(ExpressionOutcome::Value(text)),
                None => return Ok(None),
            },
            (CommandKind::Expression, EXPRESSION_EXCEPTION) => match decode_text(source)? {
                Some(text) => Self::Expression(ExpressionOutcome::Exception(text)),
                None => return Ok(None),
            },
            (CommandKind::Shell, SHELL_OK) => Self::Shell(ShellOutcome::Ok),
            (CommandKind::Shell, SHELL_ERROR) => match decode_text(source)? {
                Some(text) => Self::Shell(ShellOutcome::Error(text)),
                None => return Ok(None),
            },
            _ => {
                return Err(WireError::UnknownResultCode {
                    kind: kind_code,
                    code,
                });
            }
        };
        Ok(Some(reply))
    }
}
