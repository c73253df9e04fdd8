//! Child process handle with line-buffered, merged output.

use std::io::{self, BufRead, BufReader, PipeReader};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tracing::{debug, trace};

use super::{AsyncProcess, LineWait, NETWORK_TARGET, NetworkError};

const WAIT_POLL: Duration = Duration::from_millis(20);

/// A spawned command whose stdout and stderr feed one line queue.
///
/// The child leads its own process group so that [`AsyncProcess::terminate`]
/// reaches every process the shell started.
#[derive(Debug)]
pub struct ChildProcess {
    pid: u32,
    state: Mutex<ChildState>,
    lines: Mutex<Receiver<String>>,
}

#[derive(Debug)]
struct ChildState {
    child: Child,
    exit: Option<ExitStatus>,
}

impl ChildProcess {
    /// Spawns `command` with merged output in a new process group.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Io`] when the output pipe cannot be created
    /// and [`NetworkError::Spawn`] when the command cannot be launched.
    pub fn spawn(mut command: Command, node: &str, command_line: &str) -> Result<Self, NetworkError> {
        let (reader, writer) = io::pipe()?;
        let stderr = writer.try_clone()?;
        command
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr)
            .process_group(0);
        let child = command.spawn().map_err(|source| NetworkError::Spawn {
            node: node.to_owned(),
            command: command_line.to_owned(),
            source,
        })?;
        // Release the parent's copies of the write end so the reader sees EOF.
        drop(command);

        let pid = child.id();
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name(format!("output-{pid}"))
            .spawn(move || forward_lines(reader, &sender, pid))?;
        debug!(
            target: NETWORK_TARGET,
            pid,
            node,
            command = command_line,
            "process spawned"
        );
        Ok(Self {
            pid,
            state: Mutex::new(ChildState { child, exit: None }),
            lines: Mutex::new(receiver),
        })
    }

    fn state(&self) -> MutexGuard<'_, ChildState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn poll_exit(&self) -> Result<Option<ExitStatus>, NetworkError> {
        let mut state = self.state();
        if let Some(status) = state.exit {
            return Ok(Some(status));
        }
        let status = state
            .child
            .try_wait()
            .map_err(|source| NetworkError::Wait {
                pid: self.pid,
                source,
            })?;
        state.exit = status;
        Ok(status)
    }
}

fn forward_lines(reader: PipeReader, sender: &Sender<String>, pid: u32) {
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                let line = line.trim_end_matches(['\n', '\r']).to_owned();
                trace!(target: NETWORK_TARGET, pid, line = %line, "process output");
                // Keep reading after the receiver is gone so the child never
                // blocks on a full pipe.
                if sender.send(line).is_err() {
                    trace!(target: NETWORK_TARGET, pid, "output receiver dropped");
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => {
                debug!(target: NETWORK_TARGET, pid, error = %error, "output reader failed");
                break;
            }
        }
    }
}

impl AsyncProcess for ChildProcess {
    fn read_line(&self, wait: LineWait) -> Option<String> {
        let lines = self
            .lines
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        match wait {
            LineWait::Immediate => match lines.try_recv() {
                Ok(line) => Some(line),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
            },
            LineWait::Timeout(timeout) => match lines.recv_timeout(timeout) {
                Ok(line) => Some(line),
                Err(RecvTimeoutError::Disconnected) => {
                    drop(lines);
                    // Output is exhausted; avoid spinning on a disconnected
                    // channel while the process is still running.
                    if !self.is_finished() {
                        thread::sleep(WAIT_POLL);
                    }
                    None
                }
                Err(RecvTimeoutError::Timeout) => None,
            },
        }
    }

    fn is_finished(&self) -> bool {
        match self.poll_exit() {
            Ok(status) => status.is_some(),
            Err(error) => {
                debug!(target: NETWORK_TARGET, pid = self.pid, error = %error, "exit poll failed");
                true
            }
        }
    }

    fn terminate(&self) -> Result<(), NetworkError> {
        if self.is_finished() {
            return Ok(());
        }
        let pgid = i32::try_from(self.pid).map_err(|_| NetworkError::Signal {
            pgid: -1,
            source: Errno::EINVAL,
        })?;
        match killpg(Pid::from_raw(pgid), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(source) => Err(NetworkError::Signal { pgid, source }),
        }
    }

    fn wait(&self) -> Result<Option<i32>, NetworkError> {
        loop {
            if let Some(status) = self.poll_exit()? {
                return Ok(status.code());
            }
            thread::sleep(WAIT_POLL);
        }
    }
}
