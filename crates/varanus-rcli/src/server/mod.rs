//! Remote-command server lifecycle.
//!
//! A run binds the control port, accepts exactly one client on a background
//! thread, and serves it until the client leaves or shutdown is requested.
//! [`RcliController`] is the host-owned handle enforcing that at most one run
//! is active at a time.

mod session;
mod settings;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;

use tracing::{info, warn};

pub use self::settings::ServerSettings;
use self::session::Session;
use crate::context::ServerContext;
use crate::transport::{ControlListener, ServerError};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Lifecycle phase of one server run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Created but not yet bound.
    Idle = 0,
    /// Bound and waiting for the client.
    Listening = 1,
    /// Serving the client.
    Connected = 2,
    /// The server thread has finished.
    ShutDown = 3,
}

impl Phase {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Listening,
            2 => Self::Connected,
            _ => Self::ShutDown,
        }
    }

    /// Returns `true` while the run listens or serves.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Listening | Self::Connected)
    }
}

#[derive(Debug)]
struct SharedPhase(AtomicU8);

impl SharedPhase {
    fn new(phase: Phase) -> Self {
        Self(AtomicU8::new(phase as u8))
    }

    fn get(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::SeqCst);
    }
}

/// Handle to one server run.
///
/// Dropping the handle requests shutdown without waiting for the thread.
#[derive(Debug)]
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
    phase: Arc<SharedPhase>,
    local_addr: SocketAddr,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Binds `settings.host():port` and starts the accept-then-serve thread.
    ///
    /// Port `0` binds an ephemeral port; see [`ServerHandle::local_addr`].
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding fails or the thread cannot be
    /// spawned.
    pub fn start(
        settings: ServerSettings,
        port: u16,
        context: ServerContext,
    ) -> Result<Self, ServerError> {
        let phase = Arc::new(SharedPhase::new(Phase::Idle));
        let listener = ControlListener::bind(settings.host(), port)?;
        let local_addr = listener.local_addr();
        let shutdown = Arc::new(AtomicBool::new(false));
        phase.set(Phase::Listening);

        let session = Session {
            listener,
            settings,
            context,
            shutdown: Arc::clone(&shutdown),
            phase: Arc::clone(&phase),
        };
        let thread = thread::Builder::new()
            .name(String::from("rcli-server"))
            .spawn(move || session.run())
            .map_err(|source| {
                phase.set(Phase::ShutDown);
                ServerError::ThreadSpawn { source }
            })?;
        info!(
            target: SERVER_TARGET,
            addr = %local_addr,
            "rcli server listening"
        );
        Ok(Self {
            shutdown,
            phase,
            local_addr,
            thread: Some(thread),
        })
    }

    /// Address the run is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Returns `true` while the run listens or serves.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase().is_active()
    }

    /// Requests cooperative shutdown. Observed within one poll interval.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the server thread to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ThreadPanic`] when the thread panicked.
    pub fn join(mut self) -> Result<(), ServerError> {
        match self.thread.take() {
            Some(handle) => handle.join().map_err(|_| ServerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Host-facing start/stop/status surface with at most one active run.
#[derive(Debug)]
pub struct RcliController {
    settings: ServerSettings,
    context: ServerContext,
    handle: Option<ServerHandle>,
}

impl RcliController {
    /// Controller with no active run.
    #[must_use]
    pub fn new(settings: ServerSettings, context: ServerContext) -> Self {
        Self {
            settings,
            context,
            handle: None,
        }
    }

    /// Returns `true` while a run listens or serves.
    #[must_use]
    pub fn status(&self) -> bool {
        self.handle.as_ref().is_some_and(ServerHandle::is_active)
    }

    /// Address of the active run, if any.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.handle
            .as_ref()
            .filter(|handle| handle.is_active())
            .map(ServerHandle::local_addr)
    }

    /// Starts a run on `port`. Returns `Ok(false)` when one is already active.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the port cannot be bound.
    pub fn start(&mut self, port: u16) -> Result<bool, ServerError> {
        if self.status() {
            return Ok(false);
        }
        self.reap();
        let handle = ServerHandle::start(self.settings.clone(), port, self.context.clone())?;
        self.handle = Some(handle);
        Ok(true)
    }

    /// Stops the active run and waits for its thread. Returns `false` when no
    /// run was active.
    ///
    /// Shell commands started by the run keep running.
    pub fn stop(&mut self) -> bool {
        if !self.status() {
            self.reap();
            return false;
        }
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
            join_logged(handle);
        }
        true
    }

    /// Collects a run that ended on its own.
    fn reap(&mut self) {
        if let Some(handle) = self.handle.take() {
            join_logged(handle);
        }
    }
}

impl Drop for RcliController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join_logged(handle: ServerHandle) {
    if let Err(error) = handle.join() {
        warn!(target: SERVER_TARGET, error = %error, "rcli server thread failed");
    }
}
