//! Command-line interface definition for the console binary.

use clap::Parser;
use varanus_rcli::network::NodeSpec;

/// Launch arguments for the Varanus console.
///
/// Configuration flags are split off before clap sees the arguments, so this
/// only describes the node table.
#[derive(Parser, Debug)]
#[command(name = "varanus", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Nodes to expose, as `name` or `name@netns`.
    #[arg(value_name = "NODE", num_args = 0..)]
    pub(crate) nodes: Vec<NodeSpec>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_plain_and_namespaced_nodes() {
        let cli = Cli::try_parse_from(["varanus", "h1", "h2@ns2"]).expect("valid nodes");
        let rendered: Vec<String> = cli.nodes.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["h1", "h2@ns2"]);
    }

    #[rstest]
    #[case("@ns")]
    #[case("h1@")]
    fn rejects_malformed_nodes(#[case] node: &str) {
        assert!(Cli::try_parse_from(["varanus", node]).is_err());
    }
}
