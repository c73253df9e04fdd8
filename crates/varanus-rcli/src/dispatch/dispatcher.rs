//! Routing of decoded commands to evaluation and the shell subsystem.

use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use super::DISPATCH_TARGET;
use crate::context::ServerContext;
use crate::shell::{
    HandlerSettings, ShellCommandHandler, ShellError, ShellRegistry, ShellRequest, SinkAddress,
};
use crate::wire::{Command, CommandKind, ExpressionOutcome, Reply, ShellOutcome};

/// Turns each command into exactly one reply.
///
/// The dispatcher owns the shell registry for one server run. Dropping it
/// forgets the registered handlers without stopping their processes.
#[derive(Debug)]
pub struct Dispatcher {
    context: ServerContext,
    registry: ShellRegistry,
    settings: HandlerSettings,
}

impl Dispatcher {
    /// Builds a dispatcher with an empty registry.
    #[must_use]
    pub fn new(context: ServerContext, settings: HandlerSettings) -> Self {
        Self {
            context,
            registry: ShellRegistry::new(),
            settings,
        }
    }

    /// Active shell handlers.
    #[must_use]
    pub const fn registry(&self) -> &ShellRegistry {
        &self.registry
    }

    /// Executes `command` and builds its reply. Failures become error replies.
    pub fn dispatch(&mut self, command: &Command) -> Reply {
        debug!(
            target: DISPATCH_TARGET,
            kind = ?command.kind(),
            bytes = command.payload().len(),
            "dispatching command"
        );
        match command.kind() {
            CommandKind::Expression => Reply::Expression(self.evaluate(command)),
            CommandKind::Shell => Reply::Shell(match self.execute_shell(command) {
                Ok(()) => ShellOutcome::Ok,
                Err(error) => {
                    debug!(target: DISPATCH_TARGET, error = %error, "shell command failed");
                    ShellOutcome::Error(error.to_string())
                }
            }),
        }
    }

    fn evaluate(&self, command: &Command) -> ExpressionOutcome {
        let expression = match command.text() {
            Ok(text) => text,
            Err(error) => {
                return ExpressionOutcome::Exception(format!(
                    "expression is not valid UTF-8: {error}"
                ));
            }
        };
        let evaluator = self.context.evaluator();
        let network = self.context.network();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            evaluator.evaluate(expression, network)
        }));
        match result {
            Ok(Ok(Some(value))) => ExpressionOutcome::Value(value),
            Ok(Ok(None)) => ExpressionOutcome::Null,
            Ok(Err(error)) => ExpressionOutcome::Exception(error.to_string()),
            Err(_) => ExpressionOutcome::Exception(String::from("expression evaluation panicked")),
        }
    }

    fn execute_shell(&mut self, command: &Command) -> Result<(), ShellError> {
        let text = command.text().map_err(ShellError::InvalidPayload)?;
        let request = ShellRequest::parse(text)?;
        debug!(target: DISPATCH_TARGET, key = request.key(), "shell request parsed");
        match request {
            ShellRequest::Start {
                key,
                node,
                sink,
                command: command_line,
            } => {
                let node = self.context.network().resolve_node(&node)?;
                let sink = sink.as_ref().map(SinkAddress::resolve).transpose()?;
                self.registry.ensure_vacant(&key)?;
                let mut handler =
                    ShellCommandHandler::new(key, node, sink, command_line, self.settings);
                handler.start()?;
                self.registry.insert(handler)
            }
            ShellRequest::Stop { key, custom } => {
                let mut handler = self.registry.remove(&key)?;
                match custom {
                    Some(command_line) => handler.stop_custom(&command_line),
                    None => handler.terminate(),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
