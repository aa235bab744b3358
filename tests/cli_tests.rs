use clap::Parser;
use kubectl_smart::cli::{Cli, Commands};

#[test]
fn test_cli_parsing() {
    let cli = Cli::try_parse_from(["kubectl-smart", "diag", "pod", "failing-app-xyz"]).unwrap();
    let Commands::Diag { namespace, .. } = &cli.command else {
        panic!("expected Diag");
    };
    assert_eq!(namespace, "default");

    let cli = Cli::try_parse_from(["kubectl-smart", "diag", "pod", "failing-app-xyz", "-n", "production"]).unwrap();
    let Commands::Diag { namespace, .. } = &cli.command else {
        panic!("expected Diag");
    };
    assert_eq!(namespace, "production");

    let cli = Cli::try_parse_from(["kubectl-smart", "top", "production", "--horizon", "72"]).unwrap();
    let Commands::Top { horizon, .. } = &cli.command else {
        panic!("expected Top");
    };
    assert_eq!(*horizon, 72);
}

#[test]
fn test_graph_upstream_downstream_flags() {
    let cli = Cli::try_parse_from(["kubectl-smart", "graph", "deployment", "api", "--upstream"]).unwrap();
    let Commands::Graph { upstream, downstream, .. } = &cli.command else {
        panic!("expected Graph");
    };
    assert!(upstream);
    assert!(!downstream);
}

#[test]
fn test_global_flags_apply_to_any_subcommand() {
    let cli = Cli::try_parse_from(["kubectl-smart", "--debug", "--watch", "--interval", "30", "top", "production"]).unwrap();
    assert!(cli.debug);
    assert!(cli.watch);
    assert_eq!(cli.interval, 30);
}

#[test]
fn test_horizon_default_is_forty_eight() {
    let cli = Cli::try_parse_from(["kubectl-smart", "top", "production"]).unwrap();
    let Commands::Top { horizon, .. } = &cli.command else {
        panic!("expected Top");
    };
    assert_eq!(*horizon, 48);
}
