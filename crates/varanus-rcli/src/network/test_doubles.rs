//! In-memory doubles for nodes and processes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::{AsyncProcess, LineWait, NetworkError, Node, ProcessRef};

const IDLE: Duration = Duration::from_millis(5);

/// Process whose output and exit are driven by the test.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProcess {
    lines: Mutex<VecDeque<String>>,
    finished: AtomicBool,
    terminations: AtomicUsize,
}

impl ScriptedProcess {
    pub(crate) fn with_lines(lines: &[&str]) -> Arc<Self> {
        let process = Self::default();
        for line in lines {
            process.push_line(line);
        }
        Arc::new(process)
    }

    pub(crate) fn push_line(&self, line: &str) {
        self.lines
            .lock()
            .expect("lines lock")
            .push_back(line.to_owned());
    }

    pub(crate) fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub(crate) fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

impl AsyncProcess for ScriptedProcess {
    fn read_line(&self, wait: LineWait) -> Option<String> {
        let line = self.lines.lock().expect("lines lock").pop_front();
        if line.is_none()
            && let LineWait::Timeout(timeout) = wait
        {
            thread::sleep(timeout.min(IDLE));
        }
        line
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn terminate(&self) -> Result<(), NetworkError> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        self.finish();
        Ok(())
    }

    fn wait(&self) -> Result<Option<i32>, NetworkError> {
        while !self.is_finished() {
            thread::sleep(IDLE);
        }
        Ok(Some(0))
    }
}

/// Node that hands out one scripted process and records every command.
#[derive(Debug)]
pub(crate) struct RecordingNode {
    name: String,
    process: Arc<ScriptedProcess>,
    sync_commands: Mutex<Vec<String>>,
    async_commands: Mutex<Vec<String>>,
}

impl RecordingNode {
    pub(crate) fn new(name: &str, process: Arc<ScriptedProcess>) -> Self {
        Self {
            name: name.to_owned(),
            process,
            sync_commands: Mutex::new(Vec::new()),
            async_commands: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn sync_commands(&self) -> Vec<String> {
        self.sync_commands.lock().expect("sync lock").clone()
    }

    pub(crate) fn async_commands(&self) -> Vec<String> {
        self.async_commands.lock().expect("async lock").clone()
    }
}

impl Node for RecordingNode {
    fn name(&self) -> &str {
        &self.name
    }

    /// Records the command and finishes the scripted process, as a stop
    /// command would.
    fn run_sync(&self, command_line: &str) -> Result<String, NetworkError> {
        self.sync_commands
            .lock()
            .expect("sync lock")
            .push(command_line.to_owned());
        self.process.finish();
        Ok(format!("ran {command_line}"))
    }

    fn run_async(&self, command_line: &str) -> Result<ProcessRef, NetworkError> {
        self.async_commands
            .lock()
            .expect("async lock")
            .push(command_line.to_owned());
        let process: ProcessRef = self.process.clone();
        Ok(process)
    }
}
