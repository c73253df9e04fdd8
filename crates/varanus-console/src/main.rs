//! Console entrypoint for the Varanus network-emulation console.
//!
//! The binary delegates to [`varanus_console::run`], which loads
//! configuration, builds the node table from the command line, and reads
//! console commands from stdin until `exit` or end of input.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'_> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    varanus_console::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
