//! Orchestrator: per-command workflow (spec §4.8). Validates input,
//! resolves the subject, schedules collectors, runs parsers, invokes the
//! relevant downstream component, and maps the result to an exit code.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::cluster::ClusterClient;
use crate::collectors::Collectors;
use crate::config::Config;
use crate::errors::CoreError;
use crate::forecast::{ForecastResult, Forecaster};
use crate::graph::GraphBuilder;
use crate::model::{Graph, Issue, ResourceKind, ResourceRecord, Severity};
use crate::parsers::{self, metrics_text};
use crate::scoring::{ScoringEngine, WeightsTable};

pub struct DiagOutcome {
    pub subject_full_name: String,
    pub issues: Vec<Issue>,
    pub notes: Vec<String>,
    pub elapsed: Duration,
    pub exit_code: i32,
}

pub struct GraphOutcome {
    pub graph: Graph,
    pub subject_uid: uuid::Uuid,
    pub severities: Vec<(uuid::Uuid, Severity)>,
    pub notes: Vec<String>,
    pub exit_code: i32,
    pub upstream: bool,
    pub downstream: bool,
}

/// Added/resolved issues between two `diag` runs of the same subject, keyed
/// by `(reason, resource_full_name)`.
#[derive(Debug, Clone, Default)]
pub struct IssueDiff {
    pub added: Vec<Issue>,
    pub resolved: Vec<Issue>,
}

impl IssueDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.resolved.is_empty()
    }

    pub fn describe(&self) -> Vec<String> {
        let mut out = Vec::new();
        for i in &self.added {
            out.push(format!("issue added: {} ({})", i.reason, i.resource_full_name));
        }
        for i in &self.resolved {
            out.push(format!("issue resolved: {} ({})", i.reason, i.resource_full_name));
        }
        out
    }
}

/// Computes added/resolved issues between two `diag` runs of the same
/// subject, used by `--watch` to print only what changed.
pub fn diff_issues(previous: &[Issue], current: &[Issue]) -> IssueDiff {
    let key = |i: &Issue| (i.reason.clone(), i.resource_full_name.clone());
    let prev_keys: std::collections::HashSet<_> = previous.iter().map(key).collect();
    let curr_keys: std::collections::HashSet<_> = current.iter().map(key).collect();
    let added = current.iter().filter(|i| !prev_keys.contains(&key(i))).cloned().collect();
    let resolved = previous.iter().filter(|i| !curr_keys.contains(&key(i))).cloned().collect();
    IssueDiff { added, resolved }
}

pub struct TopOutcome {
    pub forecast: ForecastResult,
    pub exit_code: i32,
}

/// Validates a CLI-supplied identifier against RFC 1123 label rules and
/// rejects shell metacharacters (spec §4.8 step 1).
pub fn validate_identifier(field: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() || value.len() > 253 {
        return Err(CoreError::InputError(format!("{field} must be 1-253 characters: {value:?}")));
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    if !valid || value.starts_with('-') || value.ends_with('-') {
        return Err(CoreError::InputError(format!("{field} must be a valid RFC 1123 label: {value:?}")));
    }
    const FORBIDDEN: &[char] = &[';', '|', '&', '$', '`', '\n', '\r', '>', '<'];
    if value.chars().any(|c| FORBIDDEN.contains(&c)) {
        return Err(CoreError::InputError(format!("{field} contains forbidden characters: {value:?}")));
    }
    Ok(())
}

pub async fn run_diag(
    client: &dyn ClusterClient,
    cfg: &Config,
    weights: &WeightsTable,
    kind: &str,
    name: &str,
    namespace: &str,
) -> Result<DiagOutcome, CoreError> {
    let start = Instant::now();
    validate_identifier("name", name)?;
    validate_identifier("namespace", namespace)?;
    let kind: ResourceKind = kind.parse().map_err(CoreError::InputError)?;

    let collectors = Collectors::new(client, cfg);
    let collected = collectors.collect_diag(kind.clone(), namespace, name).await?;

    let mut notes: Vec<String> = collected.partial_errors.iter().map(|e| format!("{}: {}", e.source, e.message)).collect();

    let mut subject_record: Option<ResourceRecord> = None;
    let mut children = Vec::new();
    for (artifact_kind, artifact) in &collected.artifacts {
        let record = parsers::parse_record(artifact, artifact_kind.clone());
        if record.kind == kind && record.name == name && record.namespace == namespace {
            subject_record = Some(record);
        } else {
            children.push(record);
        }
    }
    let subject_record = subject_record.ok_or_else(|| CoreError::NotFound(format!("{kind}/{namespace}/{name}")))?;

    let events: Vec<_> = collected.events.iter().filter_map(|a| parsers::parse_event(&a.json)).collect();
    let events = crate::parsers::events::coalesce(events);

    let mut logs = collected.logs.clone();
    if let Some(text) = &collected.describe_text {
        logs.insert("describe".to_string(), text.clone());
    }

    let engine = ScoringEngine::new(weights);
    let issues = engine.score(&subject_record, &children, &events, &logs, Utc::now());

    let highest = issues.iter().map(|i| i.score).max().unwrap_or(0);
    let exit_code = if highest >= 90 { 2 } else if highest >= 50 { 1 } else { 0 };

    notes.sort();
    notes.dedup();

    Ok(DiagOutcome {
        subject_full_name: subject_record.full_name(),
        issues,
        notes,
        elapsed: start.elapsed(),
        exit_code,
    })
}

pub async fn run_graph(
    client: &dyn ClusterClient,
    cfg: &Config,
    weights: &WeightsTable,
    kind: &str,
    name: &str,
    namespace: &str,
    upstream: bool,
    downstream: bool,
) -> Result<GraphOutcome, CoreError> {
    validate_identifier("name", name)?;
    validate_identifier("namespace", namespace)?;
    let kind: ResourceKind = kind.parse().map_err(CoreError::InputError)?;

    let collectors = Collectors::new(client, cfg);
    let collected = collectors.collect_graph(kind.clone(), namespace, name).await?;
    let notes: Vec<String> = collected.partial_errors.iter().map(|e| format!("{}: {}", e.source, e.message)).collect();

    let mut graph = Graph::new();
    let mut subject_uid = None;
    let records: Vec<ResourceRecord> = collected.artifacts.iter().map(|(k, a)| parsers::parse_record(a, k.clone())).collect();
    for record in &records {
        let is_subject = record.kind == kind && record.name == name && record.namespace == namespace;
        let uid = graph.add_vertex(record.clone());
        if is_subject {
            subject_uid = Some(uid);
        }
    }
    let subject_uid = subject_uid.ok_or_else(|| CoreError::NotFound(format!("{kind}/{namespace}/{name}")))?;

    GraphBuilder::build_edges(&mut graph);

    let engine = ScoringEngine::new(weights);
    let severities: Vec<(uuid::Uuid, Severity)> = graph
        .vertices()
        .map(|r| {
            let issues = engine.score(r, &[], &[], &HashMap::new(), Utc::now());
            let max_sev = issues.iter().map(|i| i.severity()).max().unwrap_or(Severity::Info);
            (r.uid, max_sev)
        })
        .collect();

    Ok(GraphOutcome {
        graph,
        subject_uid,
        severities,
        notes,
        exit_code: 0,
        upstream,
        downstream,
    })
}

pub async fn run_top(client: &dyn ClusterClient, cfg: &Config, namespace: &str, horizon_hours: u32, cluster_context: &str) -> Result<TopOutcome, CoreError> {
    validate_identifier("namespace", namespace)?;
    let horizon_hours = horizon_hours.clamp(1, 168);

    let collectors = Collectors::new(client, cfg);
    let collected = collectors.collect_top(namespace).await?;

    let nodes: Vec<ResourceRecord> = collected
        .artifacts
        .iter()
        .filter(|(k, _)| *k == ResourceKind::Node)
        .map(|(k, a)| parsers::parse_record(a, k.clone()))
        .collect();
    let pvcs: Vec<ResourceRecord> = collected
        .artifacts
        .iter()
        .filter(|(k, _)| *k == ResourceKind::PersistentVolumeClaim)
        .map(|(k, a)| parsers::parse_record(a, k.clone()))
        .collect();
    let secrets: Vec<ResourceRecord> = collected
        .artifacts
        .iter()
        .filter(|(k, _)| *k == ResourceKind::Secret)
        .map(|(k, a)| parsers::parse_record(a, k.clone()))
        .collect();
    let ingresses: Vec<ResourceRecord> = collected
        .artifacts
        .iter()
        .filter(|(k, _)| *k == ResourceKind::Ingress)
        .map(|(k, a)| parsers::parse_record(a, k.clone()))
        .collect();

    let metrics_available = !collected.top_nodes.is_empty() || !collected.top_pods.is_empty();

    let volume_stats = collect_volume_stats(client, &nodes, cfg).await;

    let forecaster = Forecaster::new(&cfg.cache_dir, cluster_context);
    let forecast = forecaster.analyze(
        horizon_hours,
        &collected.top_pods,
        &collected.top_nodes,
        &nodes,
        &pvcs,
        &volume_stats,
        &secrets,
        &ingresses,
        metrics_available,
        Utc::now(),
    );

    Ok(TopOutcome { forecast, exit_code: 0 })
}

/// Fetches kubelet `/stats/summary` through the apiserver node proxy for
/// every node and merges the per-volume usage maps. Best-effort: a node
/// whose proxy call fails contributes nothing rather than aborting `top`
/// (spec §4.6 degrades gracefully when kubelet stats are unavailable).
async fn collect_volume_stats(client: &dyn ClusterClient, nodes: &[ResourceRecord], cfg: &Config) -> HashMap<(String, String), metrics_text::VolumeStats> {
    let mut merged = HashMap::new();
    for node in nodes {
        let deadline = crate::cluster::Deadline::after(Duration::from_secs_f64(cfg.collector_timeout_seconds));
        let path = format!("/api/v1/nodes/{}/proxy/stats/summary", node.name);
        if let Ok(text) = client.raw_get(&path, deadline).await {
            merged.extend(metrics_text::parse_kubelet_volume_stats(&text));
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(validate_identifier("name", "app; rm -rf /").is_err());
        assert!(validate_identifier("name", "app$(whoami)").is_err());
    }

    #[test]
    fn accepts_rfc1123_names() {
        assert!(validate_identifier("name", "failing-app-xyz").is_ok());
        assert!(validate_identifier("namespace", "production").is_ok());
    }

    #[test]
    fn rejects_uppercase_and_leading_hyphen() {
        assert!(validate_identifier("name", "Invalid-Name").is_err());
        assert!(validate_identifier("name", "-leading").is_err());
    }
}
