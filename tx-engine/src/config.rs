//! Command line / environment configuration shared by binaries built on the engine.
use clap::{Args, ValueEnum};
use url::Url;

/// Which block inclusion is enough to call a submission done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum InclusionPolicy {
    /// Accept the first block that includes the extrinsic with a clean dispatch.
    #[default]
    InBlock,
    /// Treat best-block inclusion as pending and decide on finalization.
    Finalized,
}

/// CLI args for connecting to a node.
#[derive(Debug, Clone, Args)]
pub struct NodeArgs {
    /// Websocket url of the node RPC endpoint.
    #[arg(
        long = "url",
        env = "CC_NODE_URL",
        default_value = "ws://127.0.0.1:9944"
    )]
    pub rpc_url: Url,
}

/// CLI args controlling how submissions are watched.
#[derive(Debug, Clone, Copy, Args)]
pub struct SubmissionArgs {
    /// Whether inclusion in a best block is enough, or finalization is required.
    #[arg(
        long,
        env = "CC_INCLUSION_POLICY",
        value_enum,
        default_value_t = InclusionPolicy::InBlock
    )]
    pub inclusion_policy: InclusionPolicy,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestParser {
        #[command(flatten)]
        node: NodeArgs,
        #[command(flatten)]
        submission: SubmissionArgs,
    }

    #[test]
    fn we_can_parse_default_args() {
        let TestParser { node, submission } = TestParser::try_parse_from(["test"]).unwrap();

        assert_eq!(node.rpc_url.as_str(), "ws://127.0.0.1:9944/");
        assert_eq!(submission.inclusion_policy, InclusionPolicy::InBlock);
    }

    #[test]
    fn we_can_require_finalization() {
        let TestParser { submission, .. } = TestParser::try_parse_from([
            "test",
            "--inclusion-policy",
            "finalized",
            "--url",
            "ws://node.example:9944",
        ])
        .unwrap();

        assert_eq!(submission.inclusion_policy, InclusionPolicy::Finalized);
    }

    #[test]
    fn we_cannot_parse_an_unknown_policy() {
        let args = ["test", "--inclusion-policy", "eventually"];
        assert!(TestParser::try_parse_from(args).is_err());
    }
}
