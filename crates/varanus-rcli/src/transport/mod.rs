//! TCP plumbing for the control channel.
//!
//! The listener binds the control port and yields exactly one connection per
//! server run. The I/O helpers wrap every read and write in a retry loop that
//! checks the owner's shutdown predicate after each timeout.

mod errors;
mod io;
mod listener;

pub use self::errors::ServerError;
pub use self::io::{StopAwareStream, send_all};
pub use self::listener::ControlListener;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
