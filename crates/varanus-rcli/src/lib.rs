//! Remote-command gateway for the Varanus network-emulation console.
//!
//! A single operator connects over TCP and either evaluates expressions
//! against the emulated network or starts and stops long-running shell
//! commands on its nodes. Command output can be streamed live to a second TCP
//! endpoint the operator controls.
//!
//! The crate is organised leaves first:
//!
//! - [`wire`] encodes and decodes command and result frames.
//! - The transport layer wraps socket reads and writes in shutdown-aware
//!   retry loops and hands out one control connection per run.
//! - [`network`] defines the node and process contracts the server relies on,
//!   with a host-process implementation.
//! - [`shell`] manages shell command handlers and their key registry.
//! - [`Dispatcher`] routes each command to the [`Evaluator`] or the shell
//!   registry and builds exactly one reply.
//! - [`RcliController`] is the host-owned start/stop/status surface.
//!
//! Shutdown is cooperative. Every socket operation and output wait is bounded
//! by the configured poll interval and rechecks a shutdown flag, so stopping
//! the server never interrupts a blocking call. Shell commands started by a
//! run keep running after the run ends.

mod context;
mod dispatch;
pub mod network;
mod server;
pub mod shell;
pub mod telemetry;
mod transport;
pub mod wire;

pub use context::ServerContext;
pub use dispatch::{Dispatcher, EvaluationError, Evaluator};
pub use server::{Phase, RcliController, ServerHandle, ServerSettings};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ServerError;

#[cfg(test)]
mod tests;
