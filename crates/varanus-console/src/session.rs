//! Interactive console session.
//!
//! Reads one command per line and hosts the RCLI server through its
//! controller. The session owns the only handle to the server, so leaving
//! the console stops any active run.

use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::{debug, info};
use varanus_config::parse_port;
use varanus_rcli::network::Network;
use varanus_rcli::{Evaluator, RcliController};

use crate::eval::ConsoleEvaluator;
use crate::{CONSOLE_TARGET, ConsoleError};

const PROMPT: &str = "varanus> ";

const HELP: &str = "\
Commands:
  rcli start [<port>]  start the remote-command server
  rcli stop            stop the remote-command server
  rcli status          report whether the server is active
  nodes                list node names
  eval <expression>    evaluate an expression locally
  help                 show this message
  exit, quit           leave the console
";

const RCLI_USAGE: &str = "usage: rcli start [<port>] | rcli stop | rcli status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

pub(crate) struct Session<'a, W: Write, E: Write> {
    controller: RcliController,
    network: Arc<dyn Network>,
    default_port: u16,
    stdout: &'a mut W,
    stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> Session<'a, W, E> {
    pub(crate) fn new(
        controller: RcliController,
        network: Arc<dyn Network>,
        default_port: u16,
        stdout: &'a mut W,
        stderr: &'a mut E,
    ) -> Self {
        Self {
            controller,
            network,
            default_port,
            stdout,
            stderr,
        }
    }

    /// Reads commands until `exit`, `quit`, or end of input, then stops the
    /// server if it is still active.
    pub(crate) fn run<R: BufRead>(&mut self, input: &mut R) -> Result<(), ConsoleError> {
        let mut line = String::new();
        loop {
            write!(self.stdout, "{PROMPT}").map_err(ConsoleError::WriteOutput)?;
            self.stdout.flush().map_err(ConsoleError::WriteOutput)?;
            line.clear();
            if input.read_line(&mut line).map_err(ConsoleError::ReadInput)? == 0 {
                self.say(format_args!(""))?;
                break;
            }
            if self.execute(&line)? == Flow::Exit {
                break;
            }
        }
        self.shutdown()
    }

    pub(crate) fn execute(&mut self, line: &str) -> Result<Flow, ConsoleError> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        debug!(target: CONSOLE_TARGET, command, "console command");
        match command {
            "rcli" => self.rcli(words.collect::<Vec<_>>().as_slice())?,
            "nodes" => {
                let names = self.network.node_names().join(" ");
                self.say(format_args!("{names}"))?;
            }
            "eval" => {
                let expression = line.trim_start().strip_prefix("eval").unwrap_or_default().trim();
                self.evaluate(expression)?;
            }
            "help" => write!(self.stdout, "{HELP}").map_err(ConsoleError::WriteOutput)?,
            "exit" | "quit" => return Ok(Flow::Exit),
            other => self.complain(format_args!(
                "unknown command '{other}' (type 'help' for a list)"
            ))?,
        }
        Ok(Flow::Continue)
    }

    fn rcli(&mut self, args: &[&str]) -> Result<(), ConsoleError> {
        match args {
            ["start"] => self.start(self.default_port),
            ["start", text] => match parse_port(text) {
                Ok(port) => self.start(port),
                Err(error) => self.complain(format_args!("invalid port: {error}")),
            },
            ["stop"] => {
                if self.controller.stop() {
                    self.say(format_args!("RCLI server stopped"))
                } else {
                    self.say(format_args!("RCLI server inactive, nothing to stop"))
                }
            }
            ["status"] => match self.controller.local_addr() {
                Some(addr) => self.say(format_args!("RCLI server active on {addr}")),
                None => self.say(format_args!("RCLI server inactive")),
            },
            _ => self.complain(format_args!("{RCLI_USAGE}")),
        }
    }

    fn start(&mut self, port: u16) -> Result<(), ConsoleError> {
        match self.controller.start(port) {
            Ok(true) => match self.controller.local_addr() {
                Some(addr) => self.say(format_args!("RCLI server listening on {addr}")),
                // The run can finish between the start and the address lookup.
                None => self.say(format_args!("RCLI server started")),
            },
            Ok(false) => self.say(format_args!("RCLI server already active")),
            Err(error) => self.complain(format_args!("failed to start RCLI server: {error}")),
        }
    }

    fn evaluate(&mut self, expression: &str) -> Result<(), ConsoleError> {
        match ConsoleEvaluator.evaluate(expression, self.network.as_ref()) {
            Ok(Some(value)) => self.say(format_args!("{value}")),
            Ok(None) => self.say(format_args!("null")),
            Err(error) => self.complain(format_args!("error: {error}")),
        }
    }

    fn shutdown(&mut self) -> Result<(), ConsoleError> {
        if self.controller.stop() {
            info!(target: CONSOLE_TARGET, "stopped rcli server on console exit");
            self.say(format_args!("RCLI server stopped"))?;
        }
        Ok(())
    }

    fn say(&mut self, message: fmt::Arguments<'_>) -> Result<(), ConsoleError> {
        writeln!(self.stdout, "{message}").map_err(ConsoleError::WriteOutput)
    }

    fn complain(&mut self, message: fmt::Arguments<'_>) -> Result<(), ConsoleError> {
        writeln!(self.stderr, "{message}").map_err(ConsoleError::WriteOutput)
    }
}
