//! Shared configuration for the Varanus remote-command console.
//!
//! [`Config`] is loaded through `ortho_config`, which layers built-in
//! defaults, an optional TOML file (`--config-path` or
//! `VARANUS_CONFIG_PATH`), `VARANUS_*` environment variables, and CLI flags,
//! with later layers taking precedence. The server runtime only consumes the
//! derived durations and bind address, so the library crates never need to
//! load configuration themselves.

mod defaults;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_LINE_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RCLI_HOST,
    DEFAULT_RCLI_PORT, default_log_filter, default_log_filter_string, default_log_format,
    default_rcli_host,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration shared by the console and the RCLI server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "VARANUS")]
pub struct Config {
    /// Address the control listener binds to.
    #[ortho_config(default = default_rcli_host())]
    pub rcli_host: String,
    /// Control port used when `rcli start` is given no explicit port.
    #[ortho_config(default = DEFAULT_RCLI_PORT)]
    pub rcli_port: u16,
    /// Starts the server as soon as the console launches.
    #[ortho_config(default = false)]
    pub rcli_autostart: bool,
    /// Accept, socket, and shutdown poll interval in milliseconds.
    #[ortho_config(default = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
    /// Bounded wait for one process output line in milliseconds.
    #[ortho_config(default = DEFAULT_LINE_TIMEOUT_MS)]
    pub line_timeout_ms: u64,
    /// `tracing_subscriber::EnvFilter` expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log records.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rcli_host: default_rcli_host(),
            rcli_port: DEFAULT_RCLI_PORT,
            rcli_autostart: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            line_timeout_ms: DEFAULT_LINE_TIMEOUT_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Address the control listener binds to.
    #[must_use]
    pub fn rcli_host(&self) -> &str {
        &self.rcli_host
    }

    /// Control port used when `rcli start` is given no explicit port.
    #[must_use]
    pub const fn rcli_port(&self) -> u16 {
        self.rcli_port
    }

    /// Whether the console starts the server on launch.
    #[must_use]
    pub const fn rcli_autostart(&self) -> bool {
        self.rcli_autostart
    }

    /// Poll interval applied to accept loops and socket timeouts.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Bounded wait used when reading process output lines.
    #[must_use]
    pub const fn line_timeout(&self) -> Duration {
        Duration::from_millis(self.line_timeout_ms)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Checks values that the loader accepts but the runtime cannot use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a duration is zero, since a zero socket
    /// timeout means "block forever" to the standard library.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "poll_interval_ms",
            });
        }
        if self.line_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "line_timeout_ms",
            });
        }
        Ok(())
    }
}

/// Errors reported by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A duration field was configured as zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Parses a control port, rejecting zero and values above `u16::MAX`.
///
/// # Errors
///
/// Returns [`PortParseError`] when the text is not an integer in
/// `1..=65535`.
pub fn parse_port(text: &str) -> Result<u16, PortParseError> {
    let value: u32 = text
        .trim()
        .parse()
        .map_err(|_| PortParseError::NotANumber(text.to_owned()))?;
    match u16::try_from(value) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(PortParseError::OutOfRange(value)),
    }
}

/// Errors reported by [`parse_port`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortParseError {
    /// Input was not a decimal integer.
    #[error("port '{0}' is not a number")]
    NotANumber(String),
    /// Input was outside `1..=65535`.
    #[error("port {0} is out of range (must be 1-65535)")]
    OutOfRange(u32),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.rcli_host(), "127.0.0.1");
        assert_eq!(config.rcli_port(), 32770);
        assert!(!config.rcli_autostart());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.line_timeout(), Duration::from_secs(1));
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration {
                field: "poll_interval_ms"
            })
        );
    }

    #[rstest]
    #[case("1", 1)]
    #[case("32770", 32770)]
    #[case(" 65535 ", 65535)]
    fn parses_valid_ports(#[case] input: &str, #[case] expected: u16) {
        assert_eq!(parse_port(input), Ok(expected));
    }

    #[rstest]
    #[case("0", PortParseError::OutOfRange(0))]
    #[case("65536", PortParseError::OutOfRange(65536))]
    #[case("http", PortParseError::NotANumber(String::from("http")))]
    #[case("-1", PortParseError::NotANumber(String::from("-1")))]
    fn rejects_invalid_ports(#[case] input: &str, #[case] expected: PortParseError) {
        assert_eq!(parse_port(input), Err(expected));
    }
}
