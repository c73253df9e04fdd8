//! Shutdown-aware socket primitives.
//!
//! Streams handed to these helpers carry read and write timeouts equal to the
//! poll interval. A timed-out operation is retried until the supplied
//! predicate reports that the caller should stop, at which point the helper
//! gives up quietly instead of failing. The predicate is only consulted after
//! a timeout, so a request that can complete immediately always does.

use std::io::{self, Read, Write};

use crate::wire::{ByteSource, WireError};

/// Returns `true` for errors that only mean "nothing happened yet".
#[must_use]
pub fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// Writes every byte of `bytes`.
///
/// Returns `Ok(false)` when `should_stop` asked for the write to be abandoned.
///
/// # Errors
///
/// Returns [`WireError::PeerClosed`] when the stream accepts no more bytes
/// and [`WireError::Io`] for other non-transient failures.
pub fn send_all<S, F>(stream: &mut S, bytes: &[u8], should_stop: F) -> Result<bool, WireError>
where
    S: Write + ?Sized,
    F: Fn() -> bool,
{
    let mut remaining = bytes;
    while !remaining.is_empty() {
        match stream.write(remaining) {
            Ok(0) => return Err(WireError::PeerClosed),
            Ok(count) => remaining = remaining.get(count..).unwrap_or_default(),
            Err(error) if is_transient(&error) => {
                if should_stop() {
                    return Ok(false);
                }
            }
            Err(error) if is_disconnect(&error) => return Err(WireError::PeerClosed),
            Err(error) => return Err(WireError::Io(error)),
        }
    }
    loop {
        match stream.flush() {
            Ok(()) => return Ok(true),
            Err(error) if is_transient(&error) => {
                if should_stop() {
                    return Ok(false);
                }
            }
            Err(error) => return Err(WireError::Io(error)),
        }
    }
}

/// Reads exactly `len` bytes.
///
/// Returns `Ok(None)` when `should_stop` asked for the read to be abandoned.
///
/// # Errors
///
/// Returns [`WireError::PeerClosed`] when the stream ends before `len` bytes
/// arrive and [`WireError::Io`] for other non-transient failures.
pub fn recv_exact<S, F>(stream: &mut S, len: usize, should_stop: F) -> Result<Option<Vec<u8>>, WireError>
where
    S: Read + ?Sized,
    F: Fn() -> bool,
{
    let mut buffer = vec![0_u8; len];
    let mut filled = 0;
    while let Some(unfilled) = buffer.get_mut(filled..).filter(|rest| !rest.is_empty()) {
        match stream.read(unfilled) {
            Ok(0) => return Err(WireError::PeerClosed),
            Ok(count) => filled += count,
            Err(error) if is_transient(&error) => {
                if should_stop() {
                    return Ok(None);
                }
            }
            Err(error) if is_disconnect(&error) => return Err(WireError::PeerClosed),
            Err(error) => return Err(WireError::Io(error)),
        }
    }
    Ok(Some(buffer))
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

/// Couples a stream with the shutdown predicate of its owner.
pub struct StopAwareStream<'a, S: ?Sized> {
    stream: &'a mut S,
    should_stop: &'a dyn Fn() -> bool,
}

impl<'a, S: ?Sized> StopAwareStream<'a, S> {
    /// Wraps `stream`, consulting `should_stop` after every timeout.
    pub fn new(stream: &'a mut S, should_stop: &'a dyn Fn() -> bool) -> Self {
        Self {
            stream,
            should_stop,
        }
    }
}

impl<S: Write + ?Sized> StopAwareStream<'_, S> {
    /// Sends a complete buffer; see [`send_all`].
    ///
    /// # Errors
    ///
    /// Propagates [`send_all`] failures.
    pub fn send(&mut self, bytes: &[u8]) -> Result<bool, WireError> {
        send_all(self.stream, bytes, self.should_stop)
    }
}

impl<S: Read + ?Sized> ByteSource for StopAwareStream<'_, S> {
    fn read_bytes(&mut self, len: usize) -> Result<Option<Vec<u8>>, WireError> {
        recv_exact(self.stream, len, self.should_stop)
    }
}
