//! Machine output: the versioned `{schema_version, command, generated_at,
//! subject, result, notes[]}` envelope (spec §6). Field names are
//! snake_case and additive across minor versions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::forecast::ForecastResult;
use crate::model::{Graph, Issue, Severity};
use crate::scoring::select_root_cause;
use uuid::Uuid;

const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub schema_version: &'static str,
    pub command: String,
    pub generated_at: DateTime<Utc>,
    pub subject: String,
    pub result: Value,
    pub notes: Vec<String>,
}

pub fn machine_envelope(command: &str, subject: &str, result: Value, notes: Vec<String>, now: DateTime<Utc>) -> Envelope {
    Envelope {
        schema_version: SCHEMA_VERSION,
        command: command.to_string(),
        generated_at: now,
        subject: subject.to_string(),
        result,
        notes,
    }
}

pub fn diag_result(issues: &[Issue]) -> Value {
    let (root, contributing) = select_root_cause(issues);
    let critical = issues.iter().filter(|i| i.severity() == Severity::Critical).count();
    let warning = issues.iter().filter(|i| i.severity() == Severity::Warning).count();
    let info = issues.iter().filter(|i| i.severity() == Severity::Info).count();

    serde_json::json!({
        "root_cause": root,
        "contributing_factors": contributing,
        "all_issues": issues,
        "suggested_actions": root.as_ref().map(|r| r.suggested_actions.clone()).unwrap_or_default(),
        "summary": {
            "total_issues": issues.len(),
            "critical": critical,
            "warning": warning,
            "info": info,
        }
    })
}

pub fn graph_result(graph: &Graph, subject: Uuid, upstream: bool, downstream: bool) -> Value {
    let (upstream, downstream) = super::resolve_graph_directions(upstream, downstream);

    let downstream_edges = if downstream { graph.bfs(subject, true) } else { Vec::new() };
    let upstream_edges = if upstream { graph.bfs(subject, false) } else { Vec::new() };

    let mut reachable: std::collections::HashSet<Uuid> = std::collections::HashSet::new();
    reachable.insert(subject);
    for e in downstream_edges.iter().chain(upstream_edges.iter()) {
        reachable.insert(e.from);
        reachable.insert(e.to);
    }

    let nodes: Vec<Value> = graph
        .vertices()
        .filter(|r| reachable.contains(&r.uid))
        .map(|r| {
            serde_json::json!({
                "uid": r.uid,
                "kind": r.kind.as_str(),
                "namespace": r.namespace,
                "name": r.name,
                "full_name": r.full_name(),
            })
        })
        .collect();

    let edges: Vec<Value> = downstream_edges
        .iter()
        .chain(upstream_edges.iter())
        .filter(|e| !e.is_back_reference)
        .map(|e| {
            serde_json::json!({
                "from": e.from,
                "to": e.to,
                "label": e.label.as_str(),
            })
        })
        .collect();

    let resources = nodes.len();
    let dependencies = edges.len();
    let upstream_count = upstream_edges.iter().filter(|e| !e.is_back_reference).count();
    let downstream_count = downstream_edges.iter().filter(|e| !e.is_back_reference).count();

    serde_json::json!({
        "nodes": nodes,
        "edges": edges,
        "stats": {
            "resources": resources,
            "dependencies": dependencies,
            "upstream": upstream_count,
            "downstream": downstream_count,
        }
    })
}

pub fn top_result(forecast: &ForecastResult) -> Value {
    serde_json::json!({
        "horizon_hours": forecast.horizon_hours,
        "capacity_warnings": forecast.capacity_warnings.iter().map(|w| serde_json::json!({
            "resource": w.resource,
            "current_pct": w.current_pct,
            "projected_pct": w.projected_pct,
            "hours_to_threshold": w.hours_to_threshold,
            "recommended_action": w.recommended_action,
            "severity": w.severity,
        })).collect::<Vec<_>>(),
        "certificate_warnings": forecast.certificate_warnings.iter().map(|c| serde_json::json!({
            "secret": c.secret,
            "expires": c.expires,
            "days_left": c.days_left,
            "referenced_by": c.referenced_by,
            "action": c.action,
            "severity": c.severity,
        })).collect::<Vec<_>>(),
        "notes": forecast.notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeLabel, ResourceKind, ResourceRecord};

    #[test]
    fn envelope_serializes_with_schema_version() {
        let env = machine_envelope("diag", "Pod/ns/app", serde_json::json!({}), vec![], Utc::now());
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["schema_version"], "1.0");
        assert_eq!(v["command"], "diag");
    }

    #[test]
    fn graph_result_counts_edges() {
        let mut g = Graph::new();
        let svc = g.add_vertex(ResourceRecord::new(ResourceKind::Service, "ns", "svc"));
        let pod = g.add_vertex(ResourceRecord::new(ResourceKind::Pod, "ns", "pod"));
        g.add_edge(svc, pod, EdgeLabel::Selects);
        let v = graph_result(&g, svc, false, false);
        assert_eq!(v["stats"]["resources"], 2);
        assert_eq!(v["stats"]["downstream"], 1);
    }

    #[test]
    fn graph_result_excludes_unreachable_vertices() {
        let mut g = Graph::new();
        let svc = g.add_vertex(ResourceRecord::new(ResourceKind::Service, "ns", "svc"));
        let pod = g.add_vertex(ResourceRecord::new(ResourceKind::Pod, "ns", "pod"));
        g.add_edge(svc, pod, EdgeLabel::Selects);
        let _orphan = g.add_vertex(ResourceRecord::new(ResourceKind::ConfigMap, "ns", "unrelated"));
        let v = graph_result(&g, svc, false, false);
        assert_eq!(v["stats"]["resources"], 2);
        assert_eq!(v["nodes"].as_array().unwrap().len(), 2);
    }
}
