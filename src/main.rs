use clap::Parser;
use kubectl_smart::cli::{Cli, Commands};
use kubectl_smart::cluster::{ClusterClient, KubeClusterClient};
use kubectl_smart::config::{Config, OutputFormat};
use kubectl_smart::errors::CoreError;
use kubectl_smart::model::Issue;
use kubectl_smart::orchestrator;
use kubectl_smart::render::{self, RenderOptions};
use kubectl_smart::scoring::WeightsTable;

#[derive(Default)]
struct WatchState {
    previous_issues: Option<Vec<Issue>>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.debug && std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let config = match Config::load(cli.config.as_deref().map(std::path::Path::new)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: failed to load config: {e}");
            return 2;
        }
    };

    let weights = match &config.weights_file {
        Some(path) => match WeightsTable::load_yaml(path) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("error: {e}");
                return 2;
            }
        },
        None => WeightsTable::default_table(),
    };

    let client = match KubeClusterClient::new(cli.kubeconfig.as_deref(), cli.context.as_deref()).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: failed to connect to cluster: {e}");
            eprintln!("hint: check cluster connectivity and current-context");
            return 2;
        }
    };

    let output = command_output_format(&cli.command).unwrap_or(config.default_format);
    let cluster_context = client.current_context().unwrap_or_else(|| "default".to_string());

    let mut watch_state = WatchState::default();
    loop {
        let code = run_once(&client, &config, &weights, &cli.command, output, &cluster_context, cli.watch, &mut watch_state).await;
        if !cli.watch {
            return code;
        }
        tokio::time::sleep(std::time::Duration::from_secs(cli.interval)).await;
    }
}

fn command_output_format(command: &Commands) -> Option<OutputFormat> {
    match command {
        Commands::Diag { output, .. } | Commands::Graph { output, .. } | Commands::Top { output, .. } => *output,
    }
}

async fn run_once(
    client: &KubeClusterClient,
    config: &Config,
    weights: &WeightsTable,
    command: &Commands,
    output: OutputFormat,
    cluster_context: &str,
    watch: bool,
    watch_state: &mut WatchState,
) -> i32 {
    let render_opts = RenderOptions {
        colors_enabled: config.colors_enabled && output == OutputFormat::Text,
        max_display_issues: config.max_display_issues,
    };

    match command {
        Commands::Diag { kind, name, namespace, .. } => {
            match orchestrator::run_diag(client, config, weights, kind, name, namespace).await {
                Ok(mut outcome) => {
                    if watch {
                        if let Some(previous) = &watch_state.previous_issues {
                            let diff = orchestrator::diff_issues(previous, &outcome.issues);
                            outcome.notes.extend(diff.describe());
                        }
                        watch_state.previous_issues = Some(outcome.issues.clone());
                    }
                    match output {
                        OutputFormat::Text => {
                            println!("{}", render::render_diag_human(&outcome.subject_full_name, &outcome.issues, &outcome.notes, outcome.elapsed, &render_opts));
                        }
                        OutputFormat::Json => {
                            let result = render::diag_result(&outcome.issues);
                            let envelope = render::machine_envelope("diag", &outcome.subject_full_name, result, outcome.notes, chrono::Utc::now());
                            print_json(&envelope);
                        }
                    }
                    outcome.exit_code
                }
                Err(e) => fatal(&e),
            }
        }
        Commands::Graph { kind, name, namespace, upstream, downstream, .. } => {
            match orchestrator::run_graph(client, config, weights, kind, name, namespace, *upstream, *downstream).await {
                Ok(outcome) => {
                    match output {
                        OutputFormat::Text => {
                            let subject = outcome.graph.vertex(outcome.subject_uid).map(|r| r.full_name()).unwrap_or_default();
                            println!(
                                "{}",
                                render::render_graph_human(&outcome.graph, outcome.subject_uid, &outcome.severities, outcome.upstream, outcome.downstream, &render_opts)
                            );
                            if !outcome.notes.is_empty() {
                                eprintln!("notes for {subject}:");
                                for n in &outcome.notes {
                                    eprintln!("  - {n}");
                                }
                            }
                        }
                        OutputFormat::Json => {
                            let result = render::graph_result(&outcome.graph, outcome.subject_uid, outcome.upstream, outcome.downstream);
                            let subject = outcome.graph.vertex(outcome.subject_uid).map(|r| r.full_name()).unwrap_or_default();
                            let envelope = render::machine_envelope("graph", &subject, result, outcome.notes, chrono::Utc::now());
                            print_json(&envelope);
                        }
                    }
                    outcome.exit_code
                }
                Err(e) => fatal(&e),
            }
        }
        Commands::Top { namespace, horizon, .. } => {
            match orchestrator::run_top(client, config, namespace, *horizon, cluster_context).await {
                Ok(outcome) => {
                    match output {
                        OutputFormat::Text => {
                            println!("{}", render::render_top_human(&outcome.forecast, &render_opts));
                        }
                        OutputFormat::Json => {
                            let result = render::top_result(&outcome.forecast);
                            let notes = outcome.forecast.notes.clone();
                            let envelope = render::machine_envelope("top", namespace, result, notes, chrono::Utc::now());
                            print_json(&envelope);
                        }
                    }
                    outcome.exit_code
                }
                Err(e) => fatal(&e),
            }
        }
    }
}

fn print_json(envelope: &render::Envelope) {
    match serde_json::to_string_pretty(envelope) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("error: failed to serialize output: {e}"),
    }
}

fn fatal(e: &CoreError) -> i32 {
    eprint!("error: {e}");
    if let Some(hint) = e.remediation_hint() {
        eprintln!(" ({hint})");
    } else {
        eprintln!();
    }
    e.exit_code()
}
