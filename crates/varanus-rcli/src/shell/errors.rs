//! Error types for shell-control requests.
//!
//! The `Display` form of every variant is the message returned to the client
//! in a shell `Error` result.

use std::io;
use std::str::Utf8Error;

use thiserror::Error;

use crate::network::NetworkError;

/// Malformed shell-control request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The request was blank.
    #[error("missing operation (start/start_no_output/stop/stop_custom)")]
    MissingOperation,
    /// The first token is not a known operation.
    #[error("invalid operation (must be start/start_no_output/stop/stop_custom)")]
    InvalidOperation {
        /// Rejected token.
        operation: String,
    },
    /// No key follows the operation.
    #[error("missing command key")]
    MissingKey,
    /// No node follows the key.
    #[error("missing node name")]
    MissingNode,
    /// No sink address follows the node.
    #[error("missing TCP socket address")]
    MissingSink,
    /// No command tokens remain.
    #[error("missing command")]
    MissingCommand,
    /// The sink token does not split into exactly two parts on `:`.
    #[error("invalid socket address (must be <host>:<port>)")]
    InvalidSink {
        /// Rejected token.
        address: String,
    },
    /// The sink port is not in `1..=65535`.
    #[error("invalid port '{port}' (must be 1-65535)")]
    InvalidPort {
        /// Rejected port text.
        port: String,
    },
    /// `stop` takes only a key.
    #[error("unexpected arguments after command key")]
    UnexpectedArguments,
}

/// Errors raised while executing a shell-control request.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The request text is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The request payload is not UTF-8.
    #[error("shell command is not valid UTF-8: {0}")]
    InvalidPayload(#[source] Utf8Error),
    /// `start` named a key that is already active.
    #[error("cannot start command for active key {key}")]
    DuplicateKey {
        /// Active key.
        key: String,
    },
    /// `stop` or `stop_custom` named a key that is not active.
    #[error("cannot stop command for inactive key {key}")]
    UnknownKey {
        /// Inactive key.
        key: String,
    },
    /// A handler was started twice.
    #[error("command for key {key} was already started")]
    AlreadyStarted {
        /// Handler key.
        key: String,
    },
    /// Node resolution failed.
    #[error(transparent)]
    Node(#[from] NetworkError),
    /// The sink host did not resolve.
    #[error("cannot resolve TCP socket address {address}: {source}")]
    SinkResolve {
        /// Sink as written in the request.
        address: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// Starting or stopping the process failed.
    #[error("failed to {action} command for key {key}: {source}")]
    Process {
        /// Handler key.
        key: String,
        /// Attempted action.
        action: &'static str,
        /// Collaborator failure.
        #[source]
        source: NetworkError,
    },
    /// The output thread could not be spawned.
    #[error("failed to spawn output thread for key {key}: {source}")]
    Thread {
        /// Handler key.
        key: String,
        /// Spawn failure.
        #[source]
        source: io::Error,
    },
}

impl ShellError {
    pub(crate) fn duplicate_key(key: &str) -> Self {
        Self::DuplicateKey {
            key: key.to_owned(),
        }
    }

    pub(crate) fn unknown_key(key: &str) -> Self {
        Self::UnknownKey {
            key: key.to_owned(),
        }
    }

    pub(crate) fn process(key: &str, action: &'static str, source: NetworkError) -> Self {
        Self::Process {
            key: key.to_owned(),
            action,
            source,
        }
    }
}
