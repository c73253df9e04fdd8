//! One shell command and the thread that consumes its output.

use std::collections::VecDeque;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::{SHELL_TARGET, ShellError};
use crate::network::{LineWait, NodeRef, ProcessRef};
use crate::telemetry;
use crate::transport::send_all;
use crate::wire::{WireError, encode_string};

const MAX_DIAGNOSTIC_LINES: usize = 1000;

/// Timeouts applied by handler threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerSettings {
    /// Bounded wait for one output line.
    pub line_timeout: Duration,
    /// Connect and write timeout for the output sink.
    pub socket_timeout: Duration,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            line_timeout: Duration::from_secs(1),
            socket_timeout: Duration::from_secs(1),
        }
    }
}

/// Lifecycle of a [`ShellCommandHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Not started yet.
    Created,
    /// The process is running.
    Running,
    /// The process exited on its own.
    Finished,
    /// The process was asked to stop.
    Terminated,
}

/// Owns one asynchronous process started on a node.
///
/// Dropping a handler leaves its process and output thread running.
#[derive(Debug)]
pub struct ShellCommandHandler {
    key: String,
    node: NodeRef,
    sink: Option<SocketAddr>,
    command_line: String,
    settings: HandlerSettings,
    process: Option<ProcessRef>,
    stopped: bool,
}

impl ShellCommandHandler {
    /// Builds a handler in the [`HandlerState::Created`] state.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        node: NodeRef,
        sink: Option<SocketAddr>,
        command_line: impl Into<String>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            key: key.into(),
            node,
            sink,
            command_line: command_line.into(),
            settings,
            process: None,
            stopped: false,
        }
    }

    /// Registry key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HandlerState {
        match &self.process {
            None => HandlerState::Created,
            Some(_) if self.stopped => HandlerState::Terminated,
            Some(process) if process.is_finished() => HandlerState::Finished,
            Some(_) => HandlerState::Running,
        }
    }

    /// Launches the process and its output thread.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] when the handler was already started or the
    /// process or thread cannot be spawned.
    pub fn start(&mut self) -> Result<(), ShellError> {
        if self.process.is_some() {
            return Err(ShellError::AlreadyStarted {
                key: self.key.clone(),
            });
        }
        let process = self
            .node
            .run_async(&self.command_line)
            .map_err(|source| ShellError::process(&self.key, "start", source))?;
        info!(
            target: SHELL_TARGET,
            key = %self.key,
            node = self.node.name(),
            command = %self.command_line,
            "starting shell command"
        );

        let worker = OutputWorker {
            key: self.key.clone(),
            process: Arc::clone(&process),
            sink: self.sink,
            settings: self.settings,
        };
        let span = telemetry::handler_span(&self.key);
        let spawned = thread::Builder::new()
            .name(format!("shell-{}", self.key))
            .spawn(move || span.in_scope(|| worker.run()));
        if let Err(source) = spawned {
            if let Err(error) = process.terminate() {
                warn!(target: SHELL_TARGET, key = %self.key, error = %error, "failed to terminate orphaned process");
            }
            return Err(ShellError::Thread {
                key: self.key.clone(),
                source,
            });
        }
        self.process = Some(process);
        Ok(())
    }

    /// Signals the process to exit. Does nothing once it has finished.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Process`] when the signal cannot be delivered.
    pub fn terminate(&mut self) -> Result<(), ShellError> {
        let Some(process) = &self.process else {
            return Ok(());
        };
        if process.is_finished() {
            return Ok(());
        }
        info!(
            target: SHELL_TARGET,
            key = %self.key,
            command = %self.command_line,
            "terminating shell command"
        );
        process
            .terminate()
            .map_err(|source| ShellError::process(&self.key, "terminate", source))?;
        self.stopped = true;
        Ok(())
    }

    /// Runs `command_line` synchronously on the same node to stop the process.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Process`] when the stop command cannot run.
    pub fn stop_custom(&mut self, command_line: &str) -> Result<(), ShellError> {
        info!(
            target: SHELL_TARGET,
            key = %self.key,
            command = %self.command_line,
            stop_command = command_line,
            "stopping shell command with custom command"
        );
        let output = self
            .node
            .run_sync(command_line)
            .map_err(|source| ShellError::process(&self.key, "stop", source))?;
        debug!(target: SHELL_TARGET, key = %self.key, output = %output, "custom stop output");
        self.stopped = true;
        Ok(())
    }

    /// Returns `true` once the process has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.process
            .as_ref()
            .is_some_and(|process| process.is_finished())
    }
}

struct OutputWorker {
    key: String,
    process: ProcessRef,
    sink: Option<SocketAddr>,
    settings: HandlerSettings,
}

impl OutputWorker {
    fn run(self) {
        if let Some(sink) = self.sink {
            match self.connect(sink) {
                Ok(mut stream) => {
                    info!(
                        target: SHELL_TARGET,
                        key = %self.key,
                        sink = %sink,
                        "output sink connected"
                    );
                    if self.forward(&mut stream) {
                        return;
                    }
                }
                Err(error) => {
                    warn!(
                        target: SHELL_TARGET,
                        key = %self.key,
                        sink = %sink,
                        error = %error,
                        "failed to connect output sink; discarding output"
                    );
                }
            }
        }
        self.collect();
    }

    fn connect(&self, sink: SocketAddr) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect_timeout(&sink, self.settings.socket_timeout)?;
        stream.set_write_timeout(Some(self.settings.socket_timeout))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Streams lines until the process finishes. Returns `false` when the
    /// sink failed while the process was still producing output.
    fn forward(&self, stream: &mut TcpStream) -> bool {
        let process = self.process.as_ref();
        loop {
            match process.read_line(LineWait::Timeout(self.settings.line_timeout)) {
                Some(line) => {
                    if !self.send_line(stream, &line) {
                        return process.is_finished();
                    }
                }
                None if process.is_finished() => {
                    for line in process.drain_available() {
                        if !self.send_line(stream, &line) {
                            break;
                        }
                    }
                    return true;
                }
                None => {}
            }
        }
    }

    fn send_line(&self, stream: &mut TcpStream, line: &str) -> bool {
        trace!(target: SHELL_TARGET, key = %self.key, line, "forwarding output line");
        let frame = match encode_output_line(&self.key, line) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(target: SHELL_TARGET, key = %self.key, error = %error, "dropping output line");
                return true;
            }
        };
        let process = self.process.as_ref();
        match send_all(stream, &frame, || process.is_finished()) {
            Ok(sent) => sent,
            Err(error) => {
                warn!(
                    target: SHELL_TARGET,
                    key = %self.key,
                    error = %error,
                    "output sink failed; discarding further output"
                );
                false
            }
        }
    }

    fn collect(&self) {
        let process = self.process.as_ref();
        let mut lines = VecDeque::new();
        let mut push = |line: String| {
            if lines.len() == MAX_DIAGNOSTIC_LINES {
                lines.pop_front();
            }
            lines.push_back(line);
        };
        loop {
            match process.read_line(LineWait::Timeout(self.settings.line_timeout)) {
                Some(line) => push(line),
                None if process.is_finished() => {
                    process.drain_available().into_iter().for_each(&mut push);
                    break;
                }
                None => {}
            }
        }
        let output = Vec::from(lines).join("\n");
        debug!(target: SHELL_TARGET, key = %self.key, output = %output, "shell command output");
    }
}

/// Encodes one sink record: the key string followed by the line string.
fn encode_output_line(key: &str, line: &str) -> Result<Vec<u8>, WireError> {
    let mut frame = Vec::with_capacity(8 + key.len() + line.len());
    encode_string(&mut frame, key.as_bytes())?;
    encode_string(&mut frame, line.as_bytes())?;
    Ok(frame)
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
