//! Host-process implementation of the network collaborators.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::Arc;

use super::{
    ChildProcess, Network, NetworkError, Node, NodeRef, NodeSpecError, ProcessRef,
};

/// Parsed `name[@namespace]` node specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    name: String,
    namespace: Option<String>,
}

impl NodeSpec {
    /// Node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Network namespace the node's commands run in, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl FromStr for NodeSpec {
    type Err = NodeSpecError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (name, namespace) = match spec.split_once('@') {
            Some((name, namespace)) => (name, Some(namespace)),
            None => (spec, None),
        };
        if name.is_empty() {
            return Err(NodeSpecError::EmptyName {
                spec: spec.to_owned(),
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(NodeSpecError::Whitespace {
                name: name.to_owned(),
            });
        }
        if namespace.is_some_and(str::is_empty) {
            return Err(NodeSpecError::EmptyNamespace {
                spec: spec.to_owned(),
            });
        }
        Ok(Self {
            name: name.to_owned(),
            namespace: namespace.map(str::to_owned),
        })
    }
}

impl fmt::Display for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}@{namespace}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Node whose commands run as host processes through `sh -c`.
///
/// A node with a namespace prefixes the shell with `ip netns exec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNode {
    spec: NodeSpec,
}

impl LocalNode {
    /// Node running directly in the host namespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: NodeSpec {
                name: name.into(),
                namespace: None,
            },
        }
    }

    /// Node running inside the named network namespace.
    #[must_use]
    pub fn in_namespace(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            spec: NodeSpec {
                name: name.into(),
                namespace: Some(namespace.into()),
            },
        }
    }

    /// Namespace the node runs in, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.spec.namespace()
    }

    fn command(&self, command_line: &str) -> Command {
        match self.spec.namespace() {
            Some(namespace) => {
                let mut command = Command::new("ip");
                command
                    .args(["netns", "exec", namespace, "sh", "-c"])
                    .arg(command_line);
                command
            }
            None => {
                let mut command = Command::new("sh");
                command.arg("-c").arg(command_line);
                command
            }
        }
    }

    fn spawn_error(&self, command_line: &str, source: io::Error) -> NetworkError {
        NetworkError::Spawn {
            node: self.spec.name.clone(),
            command: command_line.to_owned(),
            source,
        }
    }
}

impl From<NodeSpec> for LocalNode {
    fn from(spec: NodeSpec) -> Self {
        Self { spec }
    }
}

impl Node for LocalNode {
    fn name(&self) -> &str {
        self.spec.name()
    }

    fn run_sync(&self, command_line: &str) -> Result<String, NetworkError> {
        let (mut reader, writer) = io::pipe()?;
        let stderr = writer.try_clone()?;
        let mut command = self.command(command_line);
        command.stdin(Stdio::null()).stdout(writer).stderr(stderr);
        let mut child = command
            .spawn()
            .map_err(|source| self.spawn_error(command_line, source))?;
        drop(command);

        let mut output = Vec::new();
        reader.read_to_end(&mut output)?;
        child.wait().map_err(|source| NetworkError::Wait {
            pid: child.id(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    fn run_async(&self, command_line: &str) -> Result<ProcessRef, NetworkError> {
        let process = ChildProcess::spawn(self.command(command_line), self.name(), command_line)?;
        Ok(Arc::new(process))
    }
}

/// Fixed set of nodes keyed by name.
#[derive(Debug, Default, Clone)]
pub struct StaticNetwork {
    nodes: BTreeMap<String, NodeRef>,
}

impl StaticNetwork {
    /// Empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node`, replacing any node with the same name.
    #[must_use]
    pub fn with_node(mut self, node: impl Node + 'static) -> Self {
        self.insert(Arc::new(node));
        self
    }

    /// Adds `node`, replacing any node with the same name.
    pub fn insert(&mut self, node: NodeRef) {
        self.nodes.insert(node.name().to_owned(), node);
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when no nodes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<NodeSpec> for StaticNetwork {
    fn from_iter<I: IntoIterator<Item = NodeSpec>>(specs: I) -> Self {
        specs
            .into_iter()
            .fold(Self::new(), |network, spec| network.with_node(LocalNode::from(spec)))
    }
}

impl Network for StaticNetwork {
    fn resolve_node(&self, name: &str) -> Result<NodeRef, NetworkError> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| NetworkError::unknown_node(name))
    }

    fn node_names(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("h1", "h1", None)]
    #[case("h1@ns1", "h1", Some("ns1"))]
    fn parses_node_specs(
        #[case] input: &str,
        #[case] name: &str,
        #[case] namespace: Option<&str>,
    ) {
        let spec: NodeSpec = input.parse().expect("valid spec");
        assert_eq!(spec.name(), name);
        assert_eq!(spec.namespace(), namespace);
        assert_eq!(spec.to_string(), input);
    }

    #[rstest]
    #[case("", NodeSpecError::EmptyName { spec: String::new() })]
    #[case("@ns", NodeSpecError::EmptyName { spec: String::from("@ns") })]
    #[case("h1@", NodeSpecError::EmptyNamespace { spec: String::from("h1@") })]
    #[case("h 1", NodeSpecError::Whitespace { name: String::from("h 1") })]
    fn rejects_malformed_specs(#[case] input: &str, #[case] expected: NodeSpecError) {
        assert_eq!(input.parse::<NodeSpec>(), Err(expected));
    }

    #[test]
    fn namespaced_nodes_launch_through_ip_netns() {
        let node = LocalNode::in_namespace("h1", "ns1");
        let command = node.command("echo hi");
        assert_eq!(command.get_program(), "ip");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["netns", "exec", "ns1", "sh", "-c", "echo hi"]);
    }

    #[test]
    fn run_sync_merges_output_streams() {
        let node = LocalNode::new("h1");
        let output = node.run_sync("echo one; echo two 1>&2").expect("run");
        assert!(output.contains("one\n"));
        assert!(output.contains("two\n"));
    }

    #[test]
    fn resolves_registered_nodes_only() {
        let network = StaticNetwork::new()
            .with_node(LocalNode::new("h2"))
            .with_node(LocalNode::new("h1"));
        assert_eq!(network.node_names(), ["h1", "h2"]);
        assert_eq!(network.resolve_node("h1").expect("known").name(), "h1");
        let error = network.resolve_node("h9").expect_err("unknown");
        assert_eq!(error.to_string(), "unknown node with name 'h9'");
    }

    #[test]
    fn builds_networks_from_specs() {
        let network: StaticNetwork = ["h1@ns1", "h2"]
            .into_iter()
            .map(|spec| spec.parse::<NodeSpec>().expect("spec"))
            .collect();
        assert_eq!(network.len(), 2);
    }
}
