//! Parsing of whitespace-separated shell-control requests.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use varanus_config::parse_port;

use super::{ParseError, ShellError};

const START: &str = "start";
const START_NO_OUTPUT: &str = "start_no_output";
const STOP: &str = "stop";
const STOP_CUSTOM: &str = "stop_custom";

/// TCP endpoint that receives a handler's output lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkAddress {
    host: String,
    port: u16,
}

impl SinkAddress {
    /// Builds a sink address from validated parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host part, unresolved.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port part.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Resolves the host to a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::SinkResolve`] when the host does not resolve.
    pub fn resolve(&self) -> Result<SocketAddr, ShellError> {
        let resolve_error = |source: io::Error| ShellError::SinkResolve {
            address: self.to_string(),
            source,
        };
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(resolve_error)?
            .next()
            .ok_or_else(|| {
                resolve_error(io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
            })
    }

    fn parse(token: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = token.split(':').collect();
        let [host, port] = parts.as_slice() else {
            return Err(ParseError::InvalidSink {
                address: token.to_owned(),
            });
        };
        let port = parse_port(port).map_err(|_| ParseError::InvalidPort {
            port: (*port).to_owned(),
        })?;
        Ok(Self::new(*host, port))
    }
}

impl fmt::Display for SinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A parsed shell-control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellRequest {
    /// `start` or `start_no_output`.
    Start {
        /// Registry key.
        key: String,
        /// Target node name.
        node: String,
        /// Present for `start`, absent for `start_no_output`.
        sink: Option<SinkAddress>,
        /// Command line to run.
        command: String,
    },
    /// `stop` or `stop_custom`.
    Stop {
        /// Registry key.
        key: String,
        /// Present for `stop_custom`: the command run to stop the process.
        custom: Option<String>,
    },
}

impl ShellRequest {
    /// Parses a request. Command tokens are re-joined with single spaces.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] describing the first missing or invalid part.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let Some((&operation, rest)) = tokens.split_first() else {
            return Err(ParseError::MissingOperation);
        };
        if !matches!(operation, START | START_NO_OUTPUT | STOP | STOP_CUSTOM) {
            return Err(ParseError::InvalidOperation {
                operation: operation.to_owned(),
            });
        }
        let Some((&key, rest)) = rest.split_first() else {
            return Err(ParseError::MissingKey);
        };
        let key = key.to_owned();

        match operation {
            START => {
                let (node, rest) = rest.split_first().ok_or(ParseError::MissingNode)?;
                let (sink, rest) = rest.split_first().ok_or(ParseError::MissingSink)?;
                let command = join_command(rest)?;
                Ok(Self::Start {
                    key,
                    node: (*node).to_owned(),
                    sink: Some(SinkAddress::parse(sink)?),
                    command,
                })
            }
            START_NO_OUTPUT => {
                let (node, rest) = rest.split_first().ok_or(ParseError::MissingNode)?;
                Ok(Self::Start {
                    key,
                    node: (*node).to_owned(),
                    sink: None,
                    command: join_command(rest)?,
                })
            }
            STOP if rest.is_empty() => Ok(Self::Stop { key, custom: None }),
            STOP => Err(ParseError::UnexpectedArguments),
            _ => Ok(Self::Stop {
                key,
                custom: Some(join_command(rest)?),
            }),
        }
    }

    /// Registry key the request refers to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Start { key, .. } | Self::Stop { key, .. } => key,
        }
    }
}

fn join_command(tokens: &[&str]) -> Result<String, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::MissingCommand);
    }
    Ok(tokens.join(" "))
}
