//! Console runtime for the Varanus network-emulation console.
//!
//! The console owns the node table and the RCLI server controller. It parses
//! launch arguments, bootstraps configuration and telemetry, and then reads
//! operator commands from an input stream. The interface takes its streams
//! and configuration loader as parameters so tests can drive a whole session
//! in memory.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use varanus_rcli::network::{Network, StaticNetwork};
use varanus_rcli::{RcliController, ServerContext, ServerSettings, telemetry};

mod cli;
mod config;
mod errors;
mod eval;
mod session;

use cli::Cli;
use config::{command_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::ConsoleError;
use eval::ConsoleEvaluator;
use session::Session;

const CONSOLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::console");

/// CLI flags recognised by the configuration loader that take a value.
///
/// MAINTENANCE: keep in sync with the fields of `varanus_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--rcli-host",
    "--rcli-port",
    "--poll-interval-ms",
    "--line-timeout-ms",
    "--log-filter",
    "--log-format",
];

/// Boolean configuration flags, which never consume a following value.
const CONFIG_SWITCH_FLAGS: &[&str] = &["--rcli-autostart"];

/// Runs the console using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdin, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, R, W, E, L>(
    args: I,
    stdin: &mut R,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    match run_console(args, stdin, stdout, stderr, loader) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn run_console<I, R, W, E, L>(
    args: I,
    stdin: &mut R,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> Result<(), ConsoleError>
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = match Cli::try_parse_from(command_arguments(&args, &split)) {
        Ok(cli) => cli,
        // `--help` and `--version` arrive as errors that belong on stdout.
        Err(error) if !error.use_stderr() => {
            return write!(stdout, "{error}").map_err(ConsoleError::WriteOutput);
        }
        Err(error) => return Err(ConsoleError::CliUsage(error)),
    };

    let config = loader.load(&split.config_arguments)?;
    config.validate()?;
    telemetry::initialise(&config)?;

    let network: Arc<dyn Network> = Arc::new(cli.nodes.into_iter().collect::<StaticNetwork>());
    let context = ServerContext::new(Arc::clone(&network), Arc::new(ConsoleEvaluator));
    let controller = RcliController::new(ServerSettings::from_config(&config), context);
    info!(
        target: CONSOLE_TARGET,
        nodes = network.node_names().len(),
        rcli_port = config.rcli_port(),
        "console ready"
    );

    let mut session = Session::new(controller, network, config.rcli_port(), stdout, stderr);
    if config.rcli_autostart() {
        session.execute("rcli start")?;
    }
    session.run(stdin)
}
