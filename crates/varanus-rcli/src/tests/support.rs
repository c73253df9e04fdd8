//! Shared fixtures for dispatcher and server tests.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::context::ServerContext;
use crate::dispatch::EvaluationError;
use crate::network::test_doubles::{RecordingNode, ScriptedProcess};
use crate::network::{Network, NodeRef, StaticNetwork};
use crate::server::ServerSettings;
use crate::shell::HandlerSettings;
use crate::wire::{Command, Reply, WireError};

pub(crate) const FAST_POLL: Duration = Duration::from_millis(50);

/// Adds integers separated by `+`, with a few reserved words.
pub(crate) fn sum_evaluator(
    expression: &str,
    network: &dyn Network,
) -> Result<Option<String>, EvaluationError> {
    match expression.trim() {
        "null" => Ok(None),
        "nodes()" => Ok(Some(network.node_names().join(","))),
        "panic" => panic!("evaluator panicked on purpose"),
        text => text
            .split('+')
            .map(|term| term.trim().parse::<i64>())
            .sum::<Result<i64, _>>()
            .map(|total| Some(total.to_string()))
            .map_err(|_| EvaluationError::new(format!("cannot evaluate '{text}'"))),
    }
}

/// Network with one recording node, `h1`, backed by a scripted process.
pub(crate) struct NodeHarness {
    pub(crate) process: Arc<ScriptedProcess>,
    pub(crate) node: Arc<RecordingNode>,
    pub(crate) context: ServerContext,
}

impl NodeHarness {
    pub(crate) fn new() -> Self {
        let process = ScriptedProcess::with_lines(&[]);
        let node = Arc::new(RecordingNode::new("h1", Arc::clone(&process)));
        let mut network = StaticNetwork::new();
        let shared: NodeRef = node.clone();
        network.insert(shared);
        let context = ServerContext::new(Arc::new(network), Arc::new(sum_evaluator));
        Self {
            process,
            node,
            context,
        }
    }
}

pub(crate) fn fast_handler_settings() -> HandlerSettings {
    HandlerSettings {
        line_timeout: Duration::from_millis(20),
        socket_timeout: FAST_POLL,
    }
}

pub(crate) fn fast_server_settings() -> ServerSettings {
    ServerSettings::new("127.0.0.1")
        .with_poll_interval(FAST_POLL)
        .with_line_timeout(Duration::from_millis(20))
}

/// Blocking protocol client for exercising a running server.
pub(crate) struct FrameClient {
    stream: TcpStream,
}

impl FrameClient {
    pub(crate) fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect control client");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("client read timeout");
        Self { stream }
    }

    pub(crate) fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("write frame");
    }

    pub(crate) fn send(&mut self, command: &Command) {
        let bytes = command.encode().expect("encode command");
        self.send_raw(&bytes);
    }

    /// Reads one reply; `None` when the server closed the connection.
    pub(crate) fn receive(&mut self) -> Option<Reply> {
        let mut source = ClientSource(&mut self.stream);
        match Reply::decode(&mut source) {
            Ok(reply) => reply,
            Err(error) if error.is_peer_closed() => None,
            Err(error) => panic!("unexpected reply error: {error}"),
        }
    }

    pub(crate) fn request(&mut self, command: &Command) -> Option<Reply> {
        self.send(command);
        self.receive()
    }
}

struct ClientSource<'a>(&'a mut TcpStream);

impl crate::wire::ByteSource for ClientSource<'_> {
    fn read_bytes(&mut self, len: usize) -> Result<Option<Vec<u8>>, WireError> {
        let mut buffer = vec![0_u8; len];
        match self.0.read_exact(&mut buffer) {
            Ok(()) => Ok(Some(buffer)),
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(WireError::PeerClosed)
            }
            Err(error) if error.kind() == std::io::ErrorKind::ConnectionReset => {
                Err(WireError::PeerClosed)
            }
            Err(error) => Err(WireError::Io(error)),
        }
    }
}
