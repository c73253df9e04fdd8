//! Accept-then-serve loop run on the server thread.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::{Phase, SERVER_TARGET, ServerSettings, SharedPhase};
use crate::context::ServerContext;
use crate::dispatch::Dispatcher;
use crate::telemetry;
use crate::transport::{ControlListener, StopAwareStream};
use crate::wire::{Command, Reply, WireError};

/// Marks the run as shut down however the thread exits.
struct PhaseGuard(Arc<SharedPhase>);

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        self.0.set(Phase::ShutDown);
    }
}

pub(super) struct Session {
    pub(super) listener: ControlListener,
    pub(super) settings: ServerSettings,
    pub(super) context: ServerContext,
    pub(super) shutdown: Arc<AtomicBool>,
    pub(super) phase: Arc<SharedPhase>,
}

impl Session {
    pub(super) fn run(self) {
        let _guard = PhaseGuard(Arc::clone(&self.phase));
        let _span = telemetry::run_span(self.listener.local_addr()).entered();
        let Self {
            listener,
            settings,
            context,
            shutdown,
            phase,
        } = self;

        let accepted = listener.accept_one(settings.poll_interval(), &shutdown);
        // One connection per run: stop listening before serving.
        drop(listener);
        let Some(mut stream) = accepted else {
            info!(target: SERVER_TARGET, "rcli server stopped before a client connected");
            return;
        };
        phase.set(Phase::Connected);

        let mut dispatcher = Dispatcher::new(context, settings.handler_settings());
        serve(&mut stream, &mut dispatcher, &shutdown);
        info!(
            target: SERVER_TARGET,
            active_handlers = ?dispatcher.registry().keys(),
            "rcli server stopped"
        );
    }
}

fn serve(stream: &mut TcpStream, dispatcher: &mut Dispatcher, shutdown: &AtomicBool) {
    let should_stop = || shutdown.load(Ordering::SeqCst);
    let mut io = StopAwareStream::new(stream, &should_stop);
    while !should_stop() {
        let command = match Command::decode(&mut io) {
            Ok(Some(command)) => command,
            Ok(None) => break,
            Err(error) => {
                report_connection_end(&error);
                break;
            }
        };
        let reply = dispatcher.dispatch(&command);
        let bytes = match encode_reply(&reply) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(target: SERVER_TARGET, error = %error, "failed to encode result");
                break;
            }
        };
        match io.send(&bytes) {
            Ok(true) => {}
            Ok(false) => break,
            Err(error) => {
                report_connection_end(&error);
                break;
            }
        }
    }
}

/// Encodes `reply`, replacing an oversized payload with an error of the
/// same kind.
fn encode_reply(reply: &Reply) -> Result<Vec<u8>, WireError> {
    reply.encode().or_else(|error| match error {
        WireError::StringTooLong { .. } => {
            Reply::failure(reply.kind(), error.to_string()).encode()
        }
        other => Err(other),
    })
}

fn report_connection_end(error: &WireError) {
    if error.is_peer_closed() {
        debug!(target: SERVER_TARGET, "control client closed the connection");
    } else if error.is_protocol_violation() {
        warn!(target: SERVER_TARGET, error = %error, "protocol error; closing control connection");
    } else {
        warn!(target: SERVER_TARGET, error = %error, "control connection failed");
    }
}
