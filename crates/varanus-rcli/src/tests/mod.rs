//! Behavioural suites for the remote-command server.

mod server_behaviour;
pub(crate) mod support;
