//! Typed command and result frames.

use std::str::{self, Utf8Error};

use super::WireError;

/// Command type byte for expression evaluation.
pub const EXPRESSION_COMMAND: u8 = 0;
/// Command type byte for shell control.
pub const SHELL_COMMAND: u8 = 1;

/// Expression result code: the evaluation produced no value.
pub const EXPRESSION_NULL: u8 = 0;
/// Expression result code: the evaluation produced a value.
pub const EXPRESSION_VALUE: u8 = 1;
/// Expression result code: the evaluation failed.
pub const EXPRESSION_EXCEPTION: u8 = 2;

/// Shell result code: the request succeeded.
pub const SHELL_OK: u8 = 1;
/// Shell result code: the request failed.
pub const SHELL_ERROR: u8 = 2;

/// Kind of command carried by a command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Evaluate an expression against the network environment.
    Expression,
    /// Start or stop a shell command on a node.
    Shell,
}

impl CommandKind {
    /// Wire representation of the kind.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Expression => EXPRESSION_COMMAND,
            Self::Shell => SHELL_COMMAND,
        }
    }

    /// Parses a command type byte.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownCommandType`] for bytes outside the
    /// protocol.
    pub fn from_code(code: u8) -> Result<Self, WireError> {
        match code {
            EXPRESSION_COMMAND => Ok(Self::Expression),
            SHELL_COMMAND => Ok(Self::Shell),
            _ => Err(WireError::UnknownCommandType { code }),
        }
    }
}

/// One inbound request.
///
/// The payload stays as raw bytes until dispatch so that invalid UTF-8 is
/// reported to the client as a command failure rather than a protocol error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: CommandKind,
    payload: Vec<u8>,
}

impl Command {
    /// Builds a command from its parts.
    #[must_use]
    pub fn new(kind: CommandKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Builds an expression command.
    #[must_use]
    pub fn expression(text: &str) -> Self {
        Self::new(CommandKind::Expression, text.as_bytes())
    }

    /// Builds a shell-control command.
    #[must_use]
    pub fn shell(text: &str) -> Self {
        Self::new(CommandKind::Shell, text.as_bytes())
    }

    /// Command kind.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload decoded as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns the decoding error when the payload is not valid UTF-8.
    pub fn text(&self) -> Result<&str, Utf8Error> {
        str::from_utf8(&self.payload)
    }
}

/// Outcome of an expression command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionOutcome {
    /// The expression produced no value.
    Null,
    /// String form of the produced value.
    Value(String),
    /// String form of the evaluation error.
    Exception(String),
}

/// Outcome of a shell-control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutcome {
    /// The request succeeded.
    Ok,
    /// The request failed with the given message.
    Error(String),
}

/// One outbound result, echoing the type of the command it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answer to an expression command.
    Expression(ExpressionOutcome),
    /// Answer to a shell-control command.
    Shell(ShellOutcome),
}

impl Reply {
    /// Failure reply for a command of the given kind.
    #[must_use]
    pub fn failure(kind: CommandKind, message: impl Into<String>) -> Self {
        match kind {
            CommandKind::Expression => Self::Expression(ExpressionOutcome::Exception(message.into())),
            CommandKind::Shell => Self::Shell(ShellOutcome::Error(message.into())),
        }
    }

    /// Command kind echoed by the reply.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Expression(_) => CommandKind::Expression,
            Self::Shell(_) => CommandKind::Shell,
        }
    }

    /// Result code byte.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Expression(ExpressionOutcome::Null) => EXPRESSION_NULL,
            Self::Expression(ExpressionOutcome::Value(_)) => EXPRESSION_VALUE,
            Self::Expression(ExpressionOutcome::Exception(_)) => EXPRESSION_EXCEPTION,
            Self::Shell(ShellOutcome::Ok) => SHELL_OK,
            Self::Shell(ShellOutcome::Error(_)) => SHELL_ERROR,
        }
    }

    /// Trailing string, present only for codes that carry one.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Expression(ExpressionOutcome::Value(text))
            | Self::Expression(ExpressionOutcome::Exception(text))
            | Self::Shell(ShellOutcome::Error(text)) => Some(text),
            Self::Expression(ExpressionOutcome::Null) | Self::Shell(ShellOutcome::Ok) => None,
        }
    }
}
