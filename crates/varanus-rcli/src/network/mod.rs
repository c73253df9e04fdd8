//! Collaborator contracts for the emulated network.
//!
//! The server never builds topology itself. It resolves nodes by name, runs
//! command lines on them, and reads line-buffered output from asynchronous
//! processes through the traits below. [`StaticNetwork`] and [`LocalNode`]
//! provide a host-process implementation.

mod errors;
mod local;
mod process;
#[cfg(test)]
pub(crate) mod test_doubles;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use self::errors::{NetworkError, NodeSpecError};
pub use self::local::{LocalNode, NodeSpec, StaticNetwork};
pub use self::process::ChildProcess;

const NETWORK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::network");

/// Shared reference to a resolved node.
pub type NodeRef = Arc<dyn Node>;

/// Shared reference to a running asynchronous process.
pub type ProcessRef = Arc<dyn AsyncProcess>;

/// Resolves node names for the dispatcher.
pub trait Network: Send + Sync {
    /// Looks up a node by name.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownNode`] when no node has that name.
    fn resolve_node(&self, name: &str) -> Result<NodeRef, NetworkError>;

    /// Names of every known node, in a stable order.
    fn node_names(&self) -> Vec<String>;
}

/// A place command lines can run.
pub trait Node: Send + Sync + fmt::Debug {
    /// Node name.
    fn name(&self) -> &str;

    /// Runs a command line to completion and returns its merged output.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] when the command cannot be launched.
    fn run_sync(&self, command_line: &str) -> Result<String, NetworkError>;

    /// Launches a command line and returns a handle to its output.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] when the command cannot be launched.
    fn run_async(&self, command_line: &str) -> Result<ProcessRef, NetworkError>;
}

/// How long [`AsyncProcess::read_line`] may wait for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineWait {
    /// Return at once if no line is queued.
    Immediate,
    /// Wait up to the given duration.
    Timeout(Duration),
}

/// Handle to a process whose output is consumed line by line.
pub trait AsyncProcess: Send + Sync + fmt::Debug {
    /// Next queued output line, without its terminator.
    fn read_line(&self, wait: LineWait) -> Option<String>;

    /// Returns `true` once the process has exited.
    fn is_finished(&self) -> bool;

    /// Asks the process to exit. Does nothing once it has finished.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Signal`] when the signal cannot be delivered.
    fn terminate(&self) -> Result<(), NetworkError>;

    /// Blocks until the process exits and returns its exit code, if any.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Wait`] when the exit status is unavailable.
    fn wait(&self) -> Result<Option<i32>, NetworkError>;

    /// Every line queued right now.
    fn drain_available(&self) -> Vec<String> {
        std::iter::from_fn(|| self.read_line(LineWait::Immediate)).collect()
    }
}
