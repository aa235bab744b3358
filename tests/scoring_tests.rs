use std::collections::HashMap;

use chrono::Utc;
use kubectl_smart::model::{ResourceKind, ResourceRecord};
use kubectl_smart::scoring::{select_root_cause, ScoringEngine, WeightsTable};

fn pod_with_waiting(name: &str, reason: &str, restart_count: i32) -> ResourceRecord {
    let mut r = ResourceRecord::new(ResourceKind::Pod, "production", name);
    r.ready = Some(false);
    r.set_property(
        "containerStatuses",
        serde_json::json!([{"name": "app", "restart_count": restart_count, "waiting_reason": reason, "waiting_message": null, "terminated_reason": null, "terminated_exit_code": null, "ready": false}]),
    );
    r
}

#[test]
fn test_crashloopbackoff_is_selected_as_root_cause() {
    let weights = WeightsTable::default_table();
    let engine = ScoringEngine::new(&weights);
    let subject = pod_with_waiting("failing-app-xyz", "CrashLoopBackOff", 16);

    let issues = engine.score(&subject, &[], &[], &HashMap::new(), Utc::now());
    let (root, contributing) = select_root_cause(&issues);

    let root = root.expect("expected a root cause");
    assert_eq!(root.reason, "CrashLoopBackOff");
    assert!(root.score >= 90);
    assert!(!root.suggested_actions.is_empty());
    assert!(contributing.len() <= 3);
}

#[test]
fn test_custom_weights_file_changes_base_score() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.yaml");
    std::fs::write(&path, "CrashLoopBackOff: 40\n").unwrap();
    let weights = WeightsTable::load_yaml(&path).unwrap();
    let engine = ScoringEngine::new(&weights);
    let subject = pod_with_waiting("quiet-app", "CrashLoopBackOff", 1);

    let issues = engine.score(&subject, &[], &[], &HashMap::new(), Utc::now());
    let issue = issues.iter().find(|i| i.reason == "CrashLoopBackOff").unwrap();
    assert!(issue.score < 90, "expected a lowered score, got {}", issue.score);
}

#[test]
fn test_healthy_pod_scores_no_issues() {
    let weights = WeightsTable::default_table();
    let engine = ScoringEngine::new(&weights);
    let mut subject = ResourceRecord::new(ResourceKind::Pod, "production", "healthy-app");
    subject.ready = Some(true);

    let issues = engine.score(&subject, &[], &[], &HashMap::new(), Utc::now());
    assert!(issues.is_empty());
}
