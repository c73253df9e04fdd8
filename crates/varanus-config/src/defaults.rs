use crate::logging::LogFormat;

/// Address the control listener binds to unless overridden.
pub const DEFAULT_RCLI_HOST: &str = "127.0.0.1";

/// Control port used when `rcli start` is given no explicit port.
pub const DEFAULT_RCLI_PORT: u16 = 32770;

/// Accept, socket, and shutdown poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Bounded wait for a single process output line in milliseconds.
pub const DEFAULT_LINE_TIMEOUT_MS: u64 = 1000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default bind address for the control listener.
pub fn default_rcli_host() -> String {
    DEFAULT_RCLI_HOST.to_owned()
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
