//! CLI surface, parsed with `clap::Parser`/`Subcommand`: a single `Cli`
//! struct wrapping a `Commands` enum with one variant per subcommand (`diag`,
//! `graph`, `top`), plus global flags shared across all three.

use clap::{Parser, Subcommand};

use crate::config::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "kubectl-smart", version, about = "Read-only Kubernetes diagnostic plugin", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (sets RUST_LOG=debug unless already set).
    #[arg(long, global = true)]
    pub debug: bool,

    /// Kubeconfig context to use; defaults to the current context.
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Path to the kubeconfig file; defaults to $KUBECONFIG / ~/.kube/config.
    #[arg(long, global = true)]
    pub kubeconfig: Option<String>,

    /// Path to the kubectl-smart user config file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Re-run on an interval; for diag, prints only the issues that changed
    /// since the previous run once a second run has completed.
    #[arg(long, global = true)]
    pub watch: bool,

    /// Interval in seconds between --watch re-runs.
    #[arg(long, global = true, default_value_t = 10)]
    pub interval: u64,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Diagnose why a resource is unhealthy.
    Diag {
        kind: String,
        name: String,
        #[arg(short = 'n', long, default_value = "default")]
        namespace: String,
        #[arg(long, value_enum)]
        output: Option<OutputFormat>,
    },
    /// Render the dependency graph around a resource.
    Graph {
        kind: String,
        name: String,
        #[arg(short = 'n', long, default_value = "default")]
        namespace: String,
        #[arg(long)]
        upstream: bool,
        #[arg(long)]
        downstream: bool,
        #[arg(long, value_enum)]
        output: Option<OutputFormat>,
    },
    /// Capacity and certificate-expiry forecasts for a namespace.
    Top {
        namespace: String,
        #[arg(long, default_value_t = 48, value_parser = clap::value_parser!(u32).range(1..=168))]
        horizon: u32,
        #[arg(long, value_enum)]
        output: Option<OutputFormat>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_diag_with_namespace_flag() {
        let cli = Cli::parse_from(["kubectl-smart", "diag", "pod", "failing-app-xyz", "-n", "production"]);
        match cli.command {
            Commands::Diag { kind, name, namespace, .. } => {
                assert_eq!(kind, "pod");
                assert_eq!(name, "failing-app-xyz");
                assert_eq!(namespace, "production");
            }
            other => panic!("expected Diag, got {other:?}"),
        }
    }

    #[test]
    fn rejects_horizon_out_of_range() {
        let result = Cli::try_parse_from(["kubectl-smart", "top", "production", "--horizon", "999"]);
        assert!(result.is_err());
    }
}
