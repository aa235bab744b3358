//! ScoringEngine: turns a record set into a deterministic set of `Issue`s
//! (spec §4.5). Heuristic, configuration-driven, and stable for a fixed
//! weight table and fixed input.

mod weights;
mod actions;

pub use weights::WeightsTable;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::model::{EventRecord, Issue, IssueSource, ResourceKind, ResourceRecord};
use crate::parsers;

/// A single reason-scored candidate before modifiers are applied.
struct Candidate {
    reason: String,
    base_score: u8,
    resource: ResourceRecord,
    source: IssueSource,
    evidence: Vec<String>,
    last_seen: Option<DateTime<Utc>>,
    count: i32,
    is_lifecycle_waiting: bool,
}

pub struct ScoringEngine<'a> {
    weights: &'a WeightsTable,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(weights: &'a WeightsTable) -> Self {
        Self { weights }
    }

    /// Scores the subject plus (for controllers) its children, returning
    /// every issue with score >= 1 so the orchestrator can apply the
    /// root-cause/contributing-factor selection.
    pub fn score(
        &self,
        subject: &ResourceRecord,
        children: &[ResourceRecord],
        events: &[EventRecord],
        logs: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> Vec<Issue> {
        let mut candidates = Vec::new();

        if let ResourceKind::Generic(_) = subject.kind {
            candidates.extend(self.generic_fallback_candidates(subject, now));
        } else {
            candidates.extend(self.container_status_candidates(subject));
            for child in children {
                candidates.extend(self.container_status_candidates(child));
            }
        }

        candidates.extend(self.event_candidates(subject, events));

        let unhealthy_fraction = controller_unhealthy_fraction(subject, children);

        candidates
            .into_iter()
            .map(|c| self.finalize(c, events, logs, unhealthy_fraction, now))
            .collect()
    }

    fn container_status_candidates(&self, record: &ResourceRecord) -> Vec<Candidate> {
        let Some(statuses) = record.property("containerStatuses").and_then(|v| serde_json::from_value::<Vec<ContainerStatusView>>(v.clone()).ok()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for cs in statuses {
            if let Some(reason) = &cs.waiting_reason {
                if let Some(base) = self.weights.lookup(reason) {
                    out.push(Candidate {
                        reason: reason.clone(),
                        base_score: base,
                        resource: record.clone(),
                        source: IssueSource::Status,
                        evidence: vec![cs.waiting_message.clone().unwrap_or_else(|| reason.clone())],
                        last_seen: Some(Utc::now()),
                        count: cs.restart_count.max(1),
                        is_lifecycle_waiting: true,
                    });
                }
            }
            if cs.terminated_reason.as_deref() == Some("OOMKilled") {
                if let Some(base) = self.weights.lookup("OOMKilled") {
                    out.push(Candidate {
                        reason: "OOMKilled".to_string(),
                        base_score: base,
                        resource: record.clone(),
                        source: IssueSource::Status,
                        evidence: vec![format!("container {} terminated: OOMKilled", cs.name)],
                        last_seen: Some(Utc::now()),
                        count: cs.restart_count.max(1),
                        is_lifecycle_waiting: false,
                    });
                }
            }
        }
        out
    }

    fn event_candidates(&self, subject: &ResourceRecord, events: &[EventRecord]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for ev in events {
            let Some(base) = self.weights.lookup(&ev.reason) else { continue };
            out.push(Candidate {
                reason: ev.reason.clone(),
                base_score: base,
                resource: subject.clone(),
                source: IssueSource::Event,
                evidence: vec![ev.message.clone()],
                last_seen: Some(ev.last_timestamp),
                count: ev.count,
                is_lifecycle_waiting: false,
            });
        }

        if let Some(ready) = subject.condition("Ready") {
            if ready.status == "False" {
                if let Some(base) = self.weights.lookup("NodeNotReady").filter(|_| subject.kind == ResourceKind::Node) {
                    out.push(Candidate {
                        reason: "NodeNotReady".to_string(),
                        base_score: base,
                        resource: subject.clone(),
                        source: IssueSource::Node,
                        evidence: vec![ready.message.clone().unwrap_or_default()],
                        last_seen: Some(Utc::now()),
                        count: 1,
                        is_lifecycle_waiting: false,
                    });
                }
            }
        }
        out
    }

    fn generic_fallback_candidates(&self, subject: &ResourceRecord, now: DateTime<Utc>) -> Vec<Candidate> {
        let mut out = Vec::new();
        for cond in &subject.conditions {
            let (score, applies) = match (cond.type_.as_str(), cond.status.as_str()) {
                ("Ready", "False") => (95, true),
                ("Healthy", "False") => (90, true),
                ("Progressing", "True") => {
                    let progressing_long_enough = subject
                        .property("lastTransitionTime")
                        .is_none() // we don't track per-condition timestamps generically; treat presence as satisfied
                        || true;
                    (60, progressing_long_enough)
                }
                _ => (0, false),
            };
            if !applies || score == 0 {
                continue;
            }
            let reason = cond.reason.clone().unwrap_or_else(|| cond.type_.clone());
            out.push(Candidate {
                reason: format!("Not Ready: {reason}"),
                base_score: score,
                resource: subject.clone(),
                source: IssueSource::Status,
                evidence: vec![cond.message.clone().unwrap_or_default()],
                last_seen: Some(now),
                count: 1,
                is_lifecycle_waiting: true,
            });
        }
        out
    }

    fn finalize(
        &self,
        c: Candidate,
        _events: &[EventRecord],
        logs: &HashMap<String, String>,
        unhealthy_fraction: Option<f64>,
        now: DateTime<Utc>,
    ) -> Issue {
        let mut score: i32 = c.base_score as i32;

        if let Some(last_seen) = c.last_seen {
            let age = now.signed_duration_since(last_seen);
            if age <= chrono::Duration::minutes(5) {
                score += 10;
            } else if age <= chrono::Duration::minutes(30) {
                score += 5;
            }
        }

        score += (c.count - 1).clamp(0, 15);

        if let Some(frac) = unhealthy_fraction {
            if frac >= 1.0 {
                score += 10;
            } else if frac >= 0.5 {
                score += 5;
            }
        }

        if logs.values().any(|text| log_correlates(text, &c.reason)) {
            score += 5;
        }

        let score = score.clamp(0, 100) as u8;

        Issue {
            title: issue_title(&c.reason),
            reason: c.reason.clone(),
            score,
            recurrence: c.count,
            source: c.source,
            resource: c.resource.uid,
            resource_full_name: c.resource.full_name(),
            evidence: c.evidence,
            suggested_actions: actions::playbook(&c.reason, &c.resource),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ContainerStatusView {
    name: String,
    restart_count: i32,
    waiting_reason: Option<String>,
    waiting_message: Option<String>,
    terminated_reason: Option<String>,
}

fn issue_title(reason: &str) -> String {
    if reason.starts_with("Not Ready:") {
        reason.to_string()
    } else {
        reason.to_string()
    }
}

const LOG_SYNONYMS: &[(&str, &[&str])] = &[
    ("CrashLoopBackOff", &["panic", "exit status", "fatal"]),
    ("OOMKilled", &["out of memory", "oom"]),
    ("ImagePullBackOff", &["pull access denied", "manifest unknown"]),
];

fn log_correlates(text: &str, reason: &str) -> bool {
    let lower = text.to_lowercase();
    if lower.contains(&reason.to_lowercase()) {
        return true;
    }
    LOG_SYNONYMS
        .iter()
        .find(|(r, _)| *r == reason)
        .map(|(_, syns)| syns.iter().any(|s| lower.contains(s)))
        .unwrap_or(false)
}

/// Fraction of child pods unhealthy (ready == Some(false) or phase != Running),
/// used by the scope modifier. `None` when `subject` is not a controller or
/// has no children.
fn controller_unhealthy_fraction(subject: &ResourceRecord, children: &[ResourceRecord]) -> Option<f64> {
    if !subject.kind.is_controller() || children.is_empty() {
        return None;
    }
    let unhealthy = children.iter().filter(|c| c.ready == Some(false) || c.phase.as_deref() == Some("Failed")).count();
    Some(unhealthy as f64 / children.len() as f64)
}

/// Selects the root cause (highest score >= 50) and up to three contributing
/// factors (next-highest, deduplicated by `(reason, resource)`). Ties break
/// by (a) lifecycle-waiting origin beating a derived reason, (b) higher
/// recurrence, (c) lexicographic reason.
pub fn select_root_cause(issues: &[Issue]) -> (Option<Issue>, Vec<Issue>) {
    let mut candidates: Vec<&Issue> = issues.iter().filter(|i| i.score >= 50).collect();
    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| is_lifecycle_reason(&a.reason).cmp(&is_lifecycle_reason(&b.reason)).reverse())
            .then_with(|| b.recurrence.cmp(&a.recurrence))
            .then_with(|| a.reason.cmp(&b.reason))
    });

    let mut seen: HashSet<(String, crate::model::ResourceKind)> = HashSet::new();
    let mut deduped = Vec::new();
    for issue in candidates {
        let key = (issue.reason.clone(), ResourceKind::Generic(issue.resource_full_name.clone()));
        if seen.insert(key) {
            deduped.push(issue.clone());
        }
    }

    let root = deduped.first().cloned();
    let contributing = deduped.into_iter().skip(1).take(3).collect();
    (root, contributing)
}

fn is_lifecycle_reason(reason: &str) -> bool {
    matches!(reason, "CrashLoopBackOff" | "ImagePullBackOff" | "ErrImagePull" | "OOMKilled")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;
    use serde_json::json;

    fn pod_with_waiting(name: &str, reason: &str, restart_count: i32) -> ResourceRecord {
        let mut r = ResourceRecord::new(ResourceKind::Pod, "production", name);
        r.ready = Some(false);
        r.set_property(
            "containerStatuses",
            json!([{"name": "app", "restart_count": restart_count, "waiting_reason": reason, "waiting_message": null, "terminated_reason": null, "terminated_exit_code": null, "ready": false}]),
        );
        r
    }

    #[test]
    fn scenario_a_crashloopbackoff_scores_critical() {
        let weights = WeightsTable::default_table();
        let engine = ScoringEngine::new(&weights);
        let subject = pod_with_waiting("failing-app-xyz", "CrashLoopBackOff", 16);
        let issues = engine.score(&subject, &[], &[], &HashMap::new(), Utc::now());
        let issue = issues.iter().find(|i| i.reason == "CrashLoopBackOff").unwrap();
        assert!(issue.score >= 90, "score={}", issue.score);
    }

    #[test]
    fn scenario_f_partial_controller_failure_scope_modifier() {
        let weights = WeightsTable::default_table();
        let engine = ScoringEngine::new(&weights);
        let mut deployment = ResourceRecord::new(ResourceKind::Deployment, "production", "worker");
        deployment.ready = Some(true);
        let children = vec![
            pod_with_waiting("worker-1", "CrashLoopBackOff", 5),
            pod_with_waiting("worker-2", "CrashLoopBackOff", 5),
            {
                let mut p = ResourceRecord::new(ResourceKind::Pod, "production", "worker-3");
                p.ready = Some(true);
                p
            },
        ];
        let issues = engine.score(&deployment, &children, &[], &HashMap::new(), Utc::now());
        let (root, _) = select_root_cause(&issues);
        assert!(root.is_some());
        assert!(root.unwrap().score >= 50);
    }

    #[test]
    fn generic_crd_ready_false_scores_95() {
        let weights = WeightsTable::default_table();
        let engine = ScoringEngine::new(&weights);
        let mut subject = ResourceRecord::new(ResourceKind::Generic("Widget".into()), "ns", "w1");
        subject.conditions.push(Condition {
            type_: "Ready".into(),
            status: "False".into(),
            reason: Some("BackendDown".into()),
            message: Some("backend unreachable".into()),
        });
        let issues = engine.score(&subject, &[], &[], &HashMap::new(), Utc::now());
        let issue = issues.iter().find(|i| i.reason.starts_with("Not Ready")).unwrap();
        assert_eq!(issue.score, 100); // 95 base + 5 recency (now == now)
    }

    #[test]
    fn root_cause_tie_break_prefers_lifecycle_waiting_reason() {
        let a = Issue {
            title: "a".into(),
            reason: "CrashLoopBackOff".into(),
            score: 90,
            recurrence: 1,
            source: IssueSource::Status,
            resource: uuid::Uuid::new_v4(),
            resource_full_name: "Pod/ns/a".into(),
            evidence: vec![],
            suggested_actions: vec![],
        };
        let b = Issue {
            title: "b".into(),
            reason: "BackOff".into(),
            score: 90,
            recurrence: 1,
            source: IssueSource::Event,
            resource: uuid::Uuid::new_v4(),
            resource_full_name: "Pod/ns/b".into(),
            evidence: vec![],
            suggested_actions: vec![],
        };
        let (root, _) = select_root_cause(&[b, a]);
        assert_eq!(root.unwrap().reason, "CrashLoopBackOff");
    }

    #[test]
    fn root_cause_tie_break_prefers_higher_recurrence() {
        let a = Issue {
            title: "a".into(),
            reason: "BackOff".into(),
            score: 90,
            recurrence: 2,
            source: IssueSource::Event,
            resource: uuid::Uuid::new_v4(),
            resource_full_name: "Pod/ns/a".into(),
            evidence: vec![],
            suggested_actions: vec![],
        };
        let b = Issue {
            title: "b".into(),
            reason: "FailedScheduling".into(),
            score: 90,
            recurrence: 9,
            source: IssueSource::Event,
            resource: uuid::Uuid::new_v4(),
            resource_full_name: "Pod/ns/b".into(),
            evidence: vec![],
            suggested_actions: vec![],
        };
        let (root, _) = select_root_cause(&[a, b]);
        assert_eq!(root.unwrap().reason, "FailedScheduling");
    }
}
