//! Error types for the console runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use varanus_config::ConfigError;
use varanus_rcli::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum ConsoleError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to read console input: {0}")]
    ReadInput(io::Error),
    #[error("failed to write console output: {0}")]
    WriteOutput(io::Error),
}
