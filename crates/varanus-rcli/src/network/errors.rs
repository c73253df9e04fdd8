//! Error types for node resolution and process control.

use std::io;

use thiserror::Error;

/// Errors raised by the network collaborator.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No node is registered under the requested name.
    #[error("unknown node with name '{name}'")]
    UnknownNode {
        /// Requested node name.
        name: String,
    },
    /// The command could not be launched.
    #[error("failed to run '{command}' on node {node}: {source}")]
    Spawn {
        /// Node the command targeted.
        node: String,
        /// Command line that failed to start.
        command: String,
        /// Launch failure.
        #[source]
        source: io::Error,
    },
    /// Signalling the process group failed.
    #[error("failed to signal process group {pgid}: {source}")]
    Signal {
        /// Process group identifier.
        pgid: i32,
        /// Errno reported by `killpg`.
        #[source]
        source: nix::Error,
    },
    /// Waiting for the process failed.
    #[error("failed to wait for process {pid}: {source}")]
    Wait {
        /// Process identifier.
        pid: u32,
        /// Wait failure.
        #[source]
        source: io::Error,
    },
    /// Capturing or piping command output failed.
    #[error("failed to capture command output: {source}")]
    Io {
        /// Pipe failure.
        #[from]
        source: io::Error,
    },
}

impl NetworkError {
    /// Builds a [`NetworkError::UnknownNode`] error.
    pub fn unknown_node(name: impl Into<String>) -> Self {
        Self::UnknownNode { name: name.into() }
    }
}

/// Errors raised while parsing a `name[@namespace]` node specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeSpecError {
    /// Nothing precedes the `@`.
    #[error("node specification '{spec}' has an empty name")]
    EmptyName {
        /// Rejected specification.
        spec: String,
    },
    /// Nothing follows the `@`.
    #[error("node specification '{spec}' has an empty namespace")]
    EmptyNamespace {
        /// Rejected specification.
        spec: String,
    },
    /// Node names are single tokens of shell-control requests.
    #[error("node name '{name}' must not contain whitespace")]
    Whitespace {
        /// Rejected name.
        name: String,
    },
}
