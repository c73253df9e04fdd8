//! Listener that hands out a single control connection.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::{LISTENER_TARGET, ServerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Bound, non-blocking TCP listener for the control channel.
#[derive(Debug)]
pub struct ControlListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl ControlListener {
    /// Resolves `host:port` and binds the first address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when resolution or binding fails.
    pub fn bind(host: &str, port: u16) -> Result<Self, ServerError> {
        let listener = bind_tcp(host, port)?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ServerError::NonBlocking { source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| ServerError::NonBlocking { source })?;
        Ok(Self { listener, addr })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for one client, returning `None` once `shutdown` is raised.
    ///
    /// The accepted stream is blocking with read and write timeouts of
    /// `poll_interval`, so every later socket call observes shutdown within
    /// one interval.
    pub fn accept_one(&self, poll_interval: Duration, shutdown: &AtomicBool) -> Option<TcpStream> {
        let idle = ACCEPT_BACKOFF.min(poll_interval);
        let mut last_error = None::<io::ErrorKind>;
        while !shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => match configure_stream(&stream, poll_interval) {
                    Ok(()) => {
                        info!(
                            target: LISTENER_TARGET,
                            peer = %peer,
                            "control client connected"
                        );
                        return Some(stream);
                    }
                    Err(error) => {
                        warn!(
                            target: LISTENER_TARGET,
                            peer = %peer,
                            error = %error,
                            "failed to configure control connection"
                        );
                    }
                },
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    last_error = None;
                    thread::sleep(idle);
                }
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(
                            target: LISTENER_TARGET,
                            error = %error,
                            "control accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF.min(poll_interval));
                }
            }
        }
        None
    }
}

fn configure_stream(stream: &TcpStream, poll_interval: Duration) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(poll_interval))?;
    stream.set_write_timeout(Some(poll_interval))?;
    stream.set_nodelay(true)
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ServerError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ServerError::ResolveEmpty {
        host: host.to_string(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })
}
