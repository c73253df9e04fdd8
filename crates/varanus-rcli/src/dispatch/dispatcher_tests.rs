//! Tests for command dispatch.

use std::sync::Arc;

use mockall::mock;
use rstest::{fixture, rstest};

use super::*;
use crate::network::{Network, NetworkError, NodeRef};
use crate::tests::support::{NodeHarness, fast_handler_settings, sum_evaluator};

mock! {
    Network {}
    impl Network for Network {
        fn resolve_node(&self, name: &str) -> Result<NodeRef, NetworkError>;
        fn node_names(&self) -> Vec<String>;
    }
}

struct World {
    harness: NodeHarness,
    dispatcher: Dispatcher,
}

#[fixture]
fn world() -> World {
    let harness = NodeHarness::new();
    let dispatcher = Dispatcher::new(harness.context.clone(), fast_handler_settings());
    World {
        harness,
        dispatcher,
    }
}

fn shell(world: &mut World, text: &str) -> Reply {
    world.dispatcher.dispatch(&Command::shell(text))
}

fn shell_error(text: &str) -> Reply {
    Reply::Shell(ShellOutcome::Error(text.to_owned()))
}

#[rstest]
#[case("1+1", ExpressionOutcome::Value(String::from("2")))]
#[case("null", ExpressionOutcome::Null)]
#[case("nodes()", ExpressionOutcome::Value(String::from("h1")))]
#[case("1+x", ExpressionOutcome::Exception(String::from("cannot evaluate '1+x'")))]
#[case("panic", ExpressionOutcome::Exception(String::from("expression evaluation panicked")))]
fn expressions_map_to_result_codes(
    mut world: World,
    #[case] expression: &str,
    #[case] expected: ExpressionOutcome,
) {
    let reply = world.dispatcher.dispatch(&Command::expression(expression));
    assert_eq!(reply, Reply::Expression(expected));
}

#[rstest]
fn invalid_utf8_expressions_raise_exceptions(mut world: World) {
    let command = Command::new(CommandKind::Expression, vec![0xc3, 0x28]);
    let reply = world.dispatcher.dispatch(&command);
    assert!(matches!(
        reply,
        Reply::Expression(ExpressionOutcome::Exception(message)) if message.contains("UTF-8")
    ));
}

#[rstest]
fn start_registers_the_key_without_a_listening_sink(mut world: World) {
    let reply = shell(&mut world, "start k1 h1 127.0.0.1:9999 echo hello");
    assert_eq!(reply, Reply::Shell(ShellOutcome::Ok));
    assert!(world.dispatcher.registry().contains("k1"));
    assert_eq!(world.harness.node.async_commands(), ["echo hello"]);
    world.harness.process.finish();
}

#[rstest]
fn duplicate_starts_are_rejected_without_launching(mut world: World) {
    shell(&mut world, "start_no_output k1 h1 sleep 10");
    let reply = shell(&mut world, "start_no_output k1 h1 sleep 20");
    assert_eq!(reply, shell_error("cannot start command for active key k1"));
    assert_eq!(world.harness.node.async_commands(), ["sleep 10"]);
    world.harness.process.finish();
}

#[rstest]
fn stop_terminates_and_forgets_the_key(mut world: World) {
    shell(&mut world, "start_no_output k1 h1 sleep 10");
    assert_eq!(shell(&mut world, "stop k1"), Reply::Shell(ShellOutcome::Ok));
    assert_eq!(world.harness.process.terminations(), 1);
    assert!(world.dispatcher.registry().is_empty());

    let again = shell(&mut world, "stop k1");
    assert_eq!(again, shell_error("cannot stop command for inactive key k1"));
}

#[rstest]
fn stop_custom_runs_the_stop_command(mut world: World) {
    shell(&mut world, "start_no_output k1 h1 iperf3 -s");
    let reply = shell(&mut world, "stop_custom k1 pkill -INT iperf3");
    assert_eq!(reply, Reply::Shell(ShellOutcome::Ok));
    assert_eq!(world.harness.node.sync_commands(), ["pkill -INT iperf3"]);
    assert_eq!(world.harness.process.terminations(), 0);
    assert!(!world.dispatcher.registry().contains("k1"));
}

#[rstest]
#[case("start k1 h9 127.0.0.1:9999 echo hi", "unknown node with name 'h9'")]
#[case("start k1 h1 127.0.0.1 echo hi", "invalid socket address (must be <host>:<port>)")]
#[case("restart k1", "invalid operation (must be start/start_no_output/stop/stop_custom)")]
#[case("stop_custom k1 true", "cannot stop command for inactive key k1")]
fn failures_leave_the_registry_untouched(
    mut world: World,
    #[case] text: &str,
    #[case] message: &str,
) {
    assert_eq!(shell(&mut world, text), shell_error(message));
    assert!(world.dispatcher.registry().is_empty());
    assert!(world.harness.node.async_commands().is_empty());
}

#[rstest]
fn invalid_utf8_shell_commands_are_errors(mut world: World) {
    let command = Command::new(CommandKind::Shell, vec![b's', 0xff]);
    let reply = world.dispatcher.dispatch(&command);
    assert!(matches!(
        reply,
        Reply::Shell(ShellOutcome::Error(message)) if message.contains("UTF-8")
    ));
}

#[test]
fn node_lookup_goes_through_the_network() {
    let mut network = MockNetwork::new();
    network
        .expect_resolve_node()
        .once()
        .returning(|name: &str| {
            assert_eq!(name, "h7");
            Err(NetworkError::unknown_node(name))
        });
    let context = crate::context::ServerContext::new(Arc::new(network), Arc::new(sum_evaluator));
    let mut dispatcher = Dispatcher::new(context, fast_handler_settings());

    let reply = dispatcher.dispatch(&Command::shell("start_no_output k1 h7 true"));
    assert_eq!(reply, shell_error("unknown node with name 'h7'"));
}
