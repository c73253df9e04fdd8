//! Structured telemetry for the console and server.
//!
//! Besides installing the global subscriber, this module names the spans
//! that group log records: one per server run, keyed by the bound address,
//! and one per shell handler output thread, keyed by the registry key.
//! Closing either span emits a record carrying its lifetime.

use std::io::{self, IsTerminal};
use std::net::SocketAddr;

use once_cell::sync::OnceCell;
use tracing::{Span, Subscriber, info_span, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, format::FmtSpan};

use varanus_config::{Config, LogFormat};

const RUN_SPAN: &str = "rcli_run";
const HANDLER_SPAN: &str = "shell_handler";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Later calls return a fresh [`TelemetryHandle`] without reinstalling, so
/// the filter and format of the first call win.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another
/// subscriber is already installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

/// Span wrapping one accept-then-serve run of the RCLI server.
pub(crate) fn run_span(addr: SocketAddr) -> Span {
    info_span!(target: concat!(env!("CARGO_PKG_NAME"), "::server"), RUN_SPAN, %addr)
}

/// Span wrapping the output thread of the shell handler stored under `key`.
pub(crate) fn handler_span(key: &str) -> Span {
    info_span!(target: concat!(env!("CARGO_PKG_NAME"), "::shell"), HANDLER_SPAN, key)
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |env_filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(io::stderr)
            // Colour only on interactive terminals; the console prompt
            // shares stderr with log records.
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn with_registry<T>(body: impl FnOnce() -> T) -> T {
        tracing::subscriber::with_default(tracing_subscriber::registry(), body)
    }

    #[rstest]
    fn run_spans_carry_the_bound_address() {
        let addr = SocketAddr::from(([127, 0, 0, 1], 4000));
        with_registry(|| {
            let span = run_span(addr);
            assert_eq!(span.metadata().map(|meta| meta.name()), Some(RUN_SPAN));
            assert!(span.field("addr").is_some());
            assert!(span.metadata().is_some_and(|meta| meta.target().ends_with("::server")));
        });
    }

    #[rstest]
    fn handler_spans_carry_the_registry_key() {
        with_registry(|| {
            let span = handler_span("k1");
            assert_eq!(span.metadata().map(|meta| meta.name()), Some(HANDLER_SPAN));
            assert!(span.field("key").is_some());
        });
    }

    #[test]
    fn invalid_filters_are_reported() {
        let config = Config {
            log_filter: String::from("varanus_rcli=loud"),
            ..Config::default()
        };
        let error = install_subscriber(&config).expect_err("filter must be rejected");
        assert!(matches!(error, TelemetryError::Filter(_)));
    }
}
