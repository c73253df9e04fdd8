//! Shell command lifecycle: request parsing, handlers, and the key registry.

mod command;
mod errors;
mod handler;
mod registry;

pub use self::command::{ShellRequest, SinkAddress};
pub use self::errors::{ParseError, ShellError};
pub use self::handler::{HandlerSettings, HandlerState, ShellCommandHandler};
pub use self::registry::ShellRegistry;

const SHELL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shell");
