use kubectl_smart::model::{EdgeLabel, Graph, IssueSource, ResourceKind, ResourceRecord, Severity};
use kubectl_smart::render::{self, RenderOptions};
use uuid::Uuid;

fn issue(reason: &str, score: u8) -> kubectl_smart::model::Issue {
    kubectl_smart::model::Issue {
        title: format!("{reason} detected"),
        reason: reason.to_string(),
        score,
        recurrence: 1,
        source: IssueSource::Status,
        resource: Uuid::new_v4(),
        resource_full_name: "Pod/production/failing-app-xyz".to_string(),
        evidence: vec!["container app restarted 16 times".to_string()],
        suggested_actions: vec!["kubectl logs -n production failing-app-xyz".to_string()],
    }
}

#[test]
fn test_diag_human_report_contains_root_cause_and_actions() {
    let opts = RenderOptions { colors_enabled: false, max_display_issues: 10 };
    let out = render::render_diag_human(
        "Pod/production/failing-app-xyz",
        &[issue("CrashLoopBackOff", 95)],
        &[],
        std::time::Duration::from_millis(180),
        &opts,
    );
    assert!(out.contains("ROOT CAUSE"));
    assert!(out.contains("CRITICAL"));
    assert!(out.contains("kubectl logs"));
}

#[test]
fn test_diag_machine_envelope_has_schema_version_and_summary() {
    let issues = vec![issue("CrashLoopBackOff", 95), issue("BackOff", 55)];
    let result = render::diag_result(&issues);
    let envelope = render::machine_envelope("diag", "Pod/production/failing-app-xyz", result, vec![], chrono::Utc::now());
    let value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(value["schema_version"], "1.0");
    assert_eq!(value["result"]["summary"]["total_issues"], 2);
    assert_eq!(value["result"]["summary"]["critical"], 1);
    assert_eq!(value["result"]["summary"]["warning"], 1);
}

#[test]
fn test_graph_machine_result_matches_built_graph() {
    let mut graph = Graph::new();
    let service = graph.add_vertex(ResourceRecord::new(ResourceKind::Service, "production", "api"));
    let pod = graph.add_vertex(ResourceRecord::new(ResourceKind::Pod, "production", "api-7d9f"));
    graph.add_edge(service, pod, EdgeLabel::Selects);

    let result = render::graph_result(&graph, service, false, false);
    assert_eq!(result["stats"]["resources"], 2);
    assert_eq!(result["stats"]["dependencies"], 1);
    assert_eq!(result["stats"]["downstream"], 1);
}

#[test]
fn test_service_selecting_nothing_renders_empty_tree() {
    let mut graph = Graph::new();
    let service = graph.add_vertex(ResourceRecord::new(ResourceKind::Service, "production", "orphan-svc"));
    let opts = RenderOptions { colors_enabled: false, max_display_issues: 10 };
    let out = render::render_graph_human(&graph, service, &[(service, Severity::Info)], false, false, &opts);
    assert!(out.contains("orphan-svc"));
}

#[test]
fn test_orphaned_service_excludes_unrelated_vertex_from_graph_result() {
    let mut graph = Graph::new();
    let service = graph.add_vertex(ResourceRecord::new(ResourceKind::Service, "production", "orphan-svc"));
    let _unrelated = graph.add_vertex(ResourceRecord::new(ResourceKind::Deployment, "production", "unrelated-deploy"));

    let result = render::graph_result(&graph, service, false, false);
    assert_eq!(result["stats"]["resources"], 1);
    assert_eq!(result["nodes"].as_array().unwrap().len(), 1);
    assert_eq!(result["nodes"][0]["name"], "orphan-svc");
}
