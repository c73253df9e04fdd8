//! Binary framing for the remote-command protocol.
//!
//! Every frame starts with a command type byte. Command frames follow it with
//! a length-prefixed string, result frames with a result code byte and an
//! optional length-prefixed string. Lengths are four-byte big-endian signed
//! integers; a negative length is a protocol violation.

mod codec;
mod errors;
mod frame;

pub use self::codec::{
    ByteSource, MAX_STRING_BYTES, decode_byte, decode_string, encode_byte, encode_string,
};
pub use self::errors::WireError;
pub use self::frame::{
    Command, CommandKind, EXPRESSION_COMMAND, EXPRESSION_EXCEPTION, EXPRESSION_NULL,
    EXPRESSION_VALUE, ExpressionOutcome, Reply, SHELL_COMMAND, SHELL_ERROR, SHELL_OK,
    ShellOutcome,
};
