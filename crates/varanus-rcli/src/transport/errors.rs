//! Error types for the control listener and server thread.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running the RCLI server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The bind host could not be resolved.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Requested port.
        port: u16,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The bind host resolved to no addresses.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Requested port.
        port: u16,
    },
    /// The control port could not be bound.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    Bind {
        /// Resolved bind address.
        addr: SocketAddr,
        /// Bind failure.
        #[source]
        source: io::Error,
    },
    /// The listener could not be configured for polling.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Socket option failure.
        #[source]
        source: io::Error,
    },
    /// The server thread could not be spawned.
    #[error("failed to spawn server thread: {source}")]
    ThreadSpawn {
        /// Spawn failure.
        #[source]
        source: io::Error,
    },
    /// The server thread panicked.
    #[error("server thread panicked")]
    ThreadPanic,
}
