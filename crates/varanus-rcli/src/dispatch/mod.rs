//! Command dispatch for the control connection.
//!
//! Expression commands go to the host's [`Evaluator`]; shell-control commands
//! are parsed and applied to the shell registry. Every failure is reported
//! in the reply so the connection stays usable.

mod dispatcher;
mod expression;

pub use self::dispatcher::Dispatcher;
pub use self::expression::{EvaluationError, Evaluator};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
