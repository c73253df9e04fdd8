//! Runtime settings derived from configuration.

use std::time::Duration;

use varanus_config::{Config, DEFAULT_LINE_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RCLI_HOST};

use crate::shell::HandlerSettings;

/// Bind address and timeouts used by one server run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    host: String,
    poll_interval: Duration,
    line_timeout: Duration,
}

impl ServerSettings {
    /// Settings for `host` with default timeouts.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            line_timeout: Duration::from_millis(DEFAULT_LINE_TIMEOUT_MS),
        }
    }

    /// Settings taken from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.rcli_host().to_owned(),
            poll_interval: config.poll_interval(),
            line_timeout: config.line_timeout(),
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Overrides the output line timeout.
    #[must_use]
    pub const fn with_line_timeout(mut self, line_timeout: Duration) -> Self {
        self.line_timeout = line_timeout;
        self
    }

    /// Host the control listener binds to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Accept, socket, and shutdown poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Bounded wait for one process output line.
    #[must_use]
    pub const fn line_timeout(&self) -> Duration {
        self.line_timeout
    }

    /// Timeouts handed to shell command handlers.
    #[must_use]
    pub const fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            line_timeout: self.line_timeout,
            socket_timeout: self.poll_interval,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::new(DEFAULT_RCLI_HOST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_configuration() {
        let config = Config {
            rcli_host: String::from("0.0.0.0"),
            poll_interval_ms: 250,
            line_timeout_ms: 500,
            ..Config::default()
        };
        let settings = ServerSettings::from_config(&config);
        assert_eq!(settings.host(), "0.0.0.0");
        assert_eq!(settings.poll_interval(), Duration::from_millis(250));
        assert_eq!(
            settings.handler_settings(),
            HandlerSettings {
                line_timeout: Duration::from_millis(500),
                socket_timeout: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn defaults_match_the_configuration_defaults() {
        assert_eq!(
            ServerSettings::default(),
            ServerSettings::from_config(&Config::default())
        );
    }
}
