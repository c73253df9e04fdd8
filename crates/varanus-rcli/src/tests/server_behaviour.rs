//! Behavioural tests for the control connection and server lifecycle.

use std::io::Read;
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{FrameClient, NodeHarness, fast_server_settings};
use crate::server::RcliController;
use crate::wire::{Command, ExpressionOutcome, Reply, ShellOutcome, decode_string};

struct ServerWorld {
    harness: NodeHarness,
    controller: Option<RcliController>,
    client: Option<FrameClient>,
    sink: Option<TcpListener>,
    reply: Option<Reply>,
    start_result: Option<bool>,
    stop_result: Option<bool>,
}

impl ServerWorld {
    fn new() -> Self {
        Self {
            harness: NodeHarness::new(),
            controller: None,
            client: None,
            sink: None,
            reply: None,
            start_result: None,
            stop_result: None,
        }
    }

    fn controller(&mut self) -> &mut RcliController {
        let context = self.harness.context.clone();
        self.controller
            .get_or_insert_with(|| RcliController::new(fast_server_settings(), context))
    }

    fn client(&mut self) -> &mut FrameClient {
        self.client.as_mut().expect("control client should be connected")
    }

    fn shell(&mut self, text: &str) {
        let reply = self.client().request(&Command::shell(text));
        self.reply = reply;
    }

    fn wait_until_inactive(&mut self) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if !self.controller().status() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

impl Drop for ServerWorld {
    fn drop(&mut self) {
        self.harness.process.finish();
        self.client = None;
        if let Some(mut controller) = self.controller.take() {
            controller.stop();
        }
    }
}

#[fixture]
fn world() -> ServerWorld {
    ServerWorld::new()
}

#[given("an RCLI server with node h1")]
fn given_server(world: &mut ServerWorld) {
    assert!(world.controller().start(0).expect("start server"));
}

#[given("an RCLI controller with no active server")]
fn given_idle_controller(world: &mut ServerWorld) {
    world.controller();
}

#[given("a control client is connected")]
fn given_client(world: &mut ServerWorld) {
    let addr = world.controller().local_addr().expect("server address");
    world.client = Some(FrameClient::connect(addr));
}

#[given("shell command \"{key}\" is running")]
fn given_running_command(world: &mut ServerWorld, key: String) {
    world.shell(&format!("start_no_output {key} h1 sleep 30"));
    assert_eq!(world.reply, Some(Reply::Shell(ShellOutcome::Ok)));
}

#[given("an output sink is listening")]
fn given_sink(world: &mut ServerWorld) {
    world.sink = Some(TcpListener::bind(("127.0.0.1", 0)).expect("bind sink"));
}

#[when("the client evaluates \"{expression}\"")]
fn when_evaluate(world: &mut ServerWorld, expression: String) {
    let reply = world.client().request(&Command::expression(&expression));
    world.reply = reply;
}

#[when("the client sends shell command \"{text}\"")]
fn when_shell(world: &mut ServerWorld, text: String) {
    world.shell(&text);
}

#[when("the client starts \"{key}\" on h1 with output to the sink")]
fn when_start_with_sink(world: &mut ServerWorld, key: String) {
    let addr = world
        .sink
        .as_ref()
        .expect("sink should be listening")
        .local_addr()
        .expect("sink address");
    world.shell(&format!("start {key} h1 {addr} tail -f log"));
    assert_eq!(world.reply, Some(Reply::Shell(ShellOutcome::Ok)));
}

#[when("node h1 prints \"{line}\" and exits")]
fn when_node_prints(world: &mut ServerWorld, line: String) {
    world.harness.process.push_line(&line);
    world.harness.process.finish();
}

#[when("the client sends a frame with command type {code}")]
fn when_raw_type(world: &mut ServerWorld, code: u8) {
    world.client().send_raw(&[code, 0, 0, 0, 1, b'x']);
}

#[when("the client sends an expression frame with length {length}")]
#[expect(clippy::big_endian_bytes, reason = "builds a raw wire prefix")]
fn when_raw_length(world: &mut ServerWorld, length: i32) {
    let mut frame = vec![0_u8];
    frame.extend_from_slice(&length.to_be_bytes());
    world.client().send_raw(&frame);
}

#[when("the server is started")]
fn when_started(world: &mut ServerWorld) {
    let started = world.controller().start(0).expect("start server");
    world.start_result = Some(started);
}

#[when("the server is stopped")]
fn when_stopped(world: &mut ServerWorld) {
    let stopped = world.controller().stop();
    world.stop_result = Some(stopped);
}

#[then("the reply is value \"{value}\"")]
fn then_value(world: &mut ServerWorld, value: String) {
    assert_eq!(
        world.reply,
        Some(Reply::Expression(ExpressionOutcome::Value(value)))
    );
}

#[then("the reply is exception \"{message}\"")]
fn then_exception(world: &mut ServerWorld, message: String) {
    assert_eq!(
        world.reply,
        Some(Reply::Expression(ExpressionOutcome::Exception(message)))
    );
}

#[then("the reply is null")]
fn then_null(world: &mut ServerWorld) {
    assert_eq!(world.reply, Some(Reply::Expression(ExpressionOutcome::Null)));
}

#[then("the reply is ok")]
fn then_ok(world: &mut ServerWorld) {
    assert_eq!(world.reply, Some(Reply::Shell(ShellOutcome::Ok)));
}

#[then("the reply is error \"{message}\"")]
fn then_error(world: &mut ServerWorld, message: String) {
    assert_eq!(world.reply, Some(Reply::Shell(ShellOutcome::Error(message))));
}

#[then("node h1 launched \"{command}\"")]
fn then_launched(world: &mut ServerWorld, command: String) {
    assert_eq!(world.harness.node.async_commands(), [command]);
}

#[then("the sink receives \"{line}\" for key \"{key}\"")]
fn then_sink_receives(world: &mut ServerWorld, line: String, key: String) {
    let sink = world.sink.as_ref().expect("sink should be listening");
    let (mut stream, _) = sink.accept().expect("accept forwarder");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("sink read timeout");
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).expect("read sink");

    let mut source = bytes.as_slice();
    let received_key = decode_string(&mut source).expect("key").expect("key bytes");
    let received_line = decode_string(&mut source).expect("line").expect("line bytes");
    assert_eq!(received_key, key.as_bytes());
    assert_eq!(received_line, line.as_bytes());
    assert!(source.is_empty(), "expected exactly one record");
}

#[then("the connection closes without a reply")]
fn then_closed(world: &mut ServerWorld) {
    assert_eq!(world.client().receive(), None);
}

#[then("the server becomes inactive")]
fn then_inactive_eventually(world: &mut ServerWorld) {
    assert!(world.wait_until_inactive(), "server should stop after the client leaves");
}

#[then("the server status is inactive")]
fn then_status_inactive(world: &mut ServerWorld) {
    assert!(!world.controller().status());
    if let Some(stopped) = world.stop_result {
        assert!(stopped, "stopping an active server reports true");
    }
}

#[then("the server status is active")]
fn then_status_active(world: &mut ServerWorld) {
    assert!(world.controller().status());
    assert_eq!(world.start_result, Some(true));
}

#[then("stopping the server reports false")]
fn then_stop_false(world: &mut ServerWorld) {
    assert!(!world.controller().stop());
}

#[then("starting the server again reports false")]
fn then_start_false(world: &mut ServerWorld) {
    assert!(!world.controller().start(0).expect("second start"));
}

#[scenario(
    path = "tests/features/rcli_server.feature",
    name = "Evaluating an arithmetic expression"
)]
fn evaluating_an_expression(world: ServerWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rcli_server.feature",
    name = "Evaluation failures are reported as exceptions"
)]
fn evaluation_failures(world: ServerWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rcli_server.feature",
    name = "Starting a shell command without a listening sink"
)]
fn starting_without_sink(world: ServerWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rcli_server.feature",
    name = "Stopping a shell command twice"
)]
fn stopping_twice(world: ServerWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rcli_server.feature",
    name = "Starting a duplicate key"
)]
fn duplicate_start(world: ServerWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rcli_server.feature",
    name = "Streaming output to a sink"
)]
fn streaming_output(world: ServerWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rcli_server.feature",
    name = "An unknown command type closes the connection"
)]
fn unknown_command_type(world: ServerWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rcli_server.feature",
    name = "A negative string length closes the connection"
)]
fn negative_length(world: ServerWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rcli_server.feature",
    name = "Lifecycle booleans reported to the host"
)]
fn lifecycle_booleans(world: ServerWorld) {
    let _ = world;
}
