//! Collectors: thin wrappers over `ClusterClient` that know what to fetch
//! for a given subject and command (spec §4.2). Never raise on partial
//! failure — every call's outcome is folded into `partial_errors` and the
//! run continues.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, warn};
use tokio::sync::Semaphore;

use crate::cluster::{ClusterClient, ClusterResult, Deadline, InvolvedObjectFilter, NodeTopRow, PodTopRow, RawArtifact};
use crate::config::Config;
use crate::errors::{ClusterError, CoreError};
use crate::model::ResourceKind;
use crate::parsers;

#[derive(Debug, Clone)]
pub struct PartialError {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub artifacts: Vec<(ResourceKind, RawArtifact)>,
    pub events: Vec<RawArtifact>,
    /// Keyed by `"pod/container"` (or with a `"/previous"` suffix).
    pub logs: HashMap<String, String>,
    pub top_pods: Vec<PodTopRow>,
    pub top_nodes: Vec<NodeTopRow>,
    pub partial_errors: Vec<PartialError>,
    /// Verbose status text for the subject, from `ClusterClient::describe`.
    pub describe_text: Option<String>,
}

impl Collected {
    fn note_failure(&mut self, source: &str, err: ClusterError) {
        match &err {
            ClusterError::Forbidden(m) => {
                warn!("{source}: forbidden, skipping: {m}");
                self.partial_errors.push(PartialError { source: source.to_string(), message: format!("forbidden: {m}") });
            }
            ClusterError::Timeout(m) => {
                self.partial_errors.push(PartialError { source: source.to_string(), message: format!("timed out: {m}") });
            }
            ClusterError::NotFound(m) => {
                self.partial_errors.push(PartialError { source: source.to_string(), message: format!("not found: {m}") });
            }
            ClusterError::Unavailable(m) => {
                self.partial_errors.push(PartialError { source: source.to_string(), message: format!("unavailable: {m}") });
            }
            ClusterError::Other(m) => {
                self.partial_errors.push(PartialError { source: source.to_string(), message: m.clone() });
            }
        }
    }
}

pub struct Collectors<'a> {
    client: &'a dyn ClusterClient,
    cfg: &'a Config,
    semaphore: Arc<Semaphore>,
}

impl<'a> Collectors<'a> {
    pub fn new(client: &'a dyn ClusterClient, cfg: &'a Config) -> Self {
        Self {
            client,
            cfg,
            semaphore: Arc::new(Semaphore::new(cfg.max_concurrent_collectors.max(1))),
        }
    }

    fn per_call_deadline(&self) -> Deadline {
        Deadline::after(Duration::from_secs_f64(self.cfg.collector_timeout_seconds))
    }

    fn run_deadline(&self) -> Deadline {
        Deadline::after(Duration::from_secs_f64(self.cfg.run_timeout_seconds))
    }

    /// `diag`: subject + events + per-container logs, and for controllers
    /// their child pods resolved via ownerReferences/label selectors.
    pub async fn collect_diag(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Collected, CoreError> {
        let run_deadline = self.run_deadline();
        let mut collected = Collected::default();

        let subject_artifact = run_deadline
            .race("get-subject", self.get_with_permit(&kind, namespace, name))
            .await
            .map_err(CoreError::from)?;

        let subject_record = parsers::parse_record(&subject_artifact, kind.clone());
        collected.artifacts.push((kind.clone(), subject_artifact));

        match run_deadline
            .race("describe", self.client.describe(&kind, namespace, name, self.per_call_deadline()))
            .await
        {
            Ok(text) => collected.describe_text = Some(text),
            Err(e) => collected.note_failure("describe", e),
        }

        let mut object_names = vec![name.to_string()];
        if kind.is_controller() {
            match self
                .collect_child_pods(&kind, namespace, &subject_record, &run_deadline)
                .await
            {
                Ok(children) => {
                    for (child_kind, artifact) in children {
                        if let Some(child_name) = artifact.json.get("metadata").and_then(|m| m.get("name")).and_then(|n| n.as_str()) {
                            object_names.push(child_name.to_string());
                        }
                        collected.artifacts.push((child_kind, artifact));
                    }
                }
                Err(e) => collected.note_failure("child-pods", e),
            }
        }

        let filter = InvolvedObjectFilter { kind: kind.clone(), namespace: namespace.to_string(), names: object_names };
        match run_deadline.race("events", self.client.events(namespace, &filter, self.per_call_deadline())).await {
            Ok(events) => collected.events = events,
            Err(e) => collected.note_failure("events", e),
        }

        self.collect_logs(&mut collected, namespace, &collected_pod_names(&collected), &run_deadline).await;

        Ok(collected)
    }

    /// `graph`: subject plus namespace-scoped candidate neighbors needed to
    /// resolve edges (workloads, services, configmaps/secrets/pvcs, nodes).
    pub async fn collect_graph(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Collected, CoreError> {
        let run_deadline = self.run_deadline();
        let mut collected = Collected::default();

        let subject_artifact = run_deadline
            .race("get-subject", self.get_with_permit(&kind, namespace, name))
            .await
            .map_err(CoreError::from)?;
        collected.artifacts.push((kind.clone(), subject_artifact));

        let neighbor_kinds = [
            ResourceKind::Pod,
            ResourceKind::ReplicaSet,
            ResourceKind::Deployment,
            ResourceKind::StatefulSet,
            ResourceKind::DaemonSet,
            ResourceKind::Job,
            ResourceKind::Service,
            ResourceKind::Ingress,
            ResourceKind::ConfigMap,
            ResourceKind::Secret,
            ResourceKind::PersistentVolumeClaim,
            ResourceKind::ServiceAccount,
            ResourceKind::HorizontalPodAutoscaler,
            ResourceKind::NetworkPolicy,
        ];

        let lists = join_all(neighbor_kinds.iter().map(|k| self.list_with_permit(k, namespace))).await;
        for (k, result) in neighbor_kinds.iter().zip(lists) {
            match result {
                Ok(artifacts) => collected.artifacts.extend(artifacts.into_iter().map(|a| (k.clone(), a))),
                Err(e) => collected.note_failure(k.as_str(), e),
            }
        }

        match run_deadline.race("nodes", self.list_with_permit(&ResourceKind::Node, "")).await {
            Ok(nodes) => collected.artifacts.extend(nodes.into_iter().map(|a| (ResourceKind::Node, a))),
            Err(e) => collected.note_failure("Node", e),
        }
        match run_deadline.race("pvs", self.list_with_permit(&ResourceKind::PersistentVolume, "")).await {
            Ok(pvs) => collected.artifacts.extend(pvs.into_iter().map(|a| (ResourceKind::PersistentVolume, a))),
            Err(e) => collected.note_failure("PersistentVolume", e),
        }

        Ok(collected)
    }

    /// `top`: all pods/PVCs/Services/Ingresses/Secrets in the namespace,
    /// plus node status and metrics.
    pub async fn collect_top(&self, namespace: &str) -> Result<Collected, CoreError> {
        let run_deadline = self.run_deadline();
        let mut collected = Collected::default();

        let kinds = [
            ResourceKind::Pod,
            ResourceKind::PersistentVolumeClaim,
            ResourceKind::Service,
            ResourceKind::Ingress,
            ResourceKind::Secret,
        ];
        let lists = join_all(kinds.iter().map(|k| self.list_with_permit(k, namespace))).await;
        for (k, result) in kinds.iter().zip(lists) {
            match result {
                Ok(artifacts) => collected.artifacts.extend(artifacts.into_iter().map(|a| (k.clone(), a))),
                Err(e) => collected.note_failure(k.as_str(), e),
            }
        }

        match run_deadline.race("nodes", self.list_with_permit(&ResourceKind::Node, "")).await {
            Ok(nodes) => collected.artifacts.extend(nodes.into_iter().map(|a| (ResourceKind::Node, a))),
            Err(e) => collected.note_failure("Node", e),
        }

        match run_deadline.race("top-pods", self.client.top_pods(namespace, self.per_call_deadline())).await {
            Ok(rows) => collected.top_pods = rows,
            Err(e) => collected.note_failure("metrics.k8s.io pods", e),
        }
        match run_deadline.race("top-nodes", self.client.top_nodes(self.per_call_deadline())).await {
            Ok(rows) => collected.top_nodes = rows,
            Err(e) => collected.note_failure("metrics.k8s.io nodes", e),
        }

        Ok(collected)
    }

    async fn collect_child_pods(
        &self,
        controller_kind: &ResourceKind,
        namespace: &str,
        subject_record: &crate::model::ResourceRecord,
        run_deadline: &Deadline,
    ) -> ClusterResult<Vec<(ResourceKind, RawArtifact)>> {
        let pods = run_deadline.race("list-pods", self.list_with_permit(&ResourceKind::Pod, namespace)).await?;
        let selector = subject_record.property("selector").and_then(|v| v.get("matchLabels")).and_then(|v| v.as_object());
        let filtered: Vec<(ResourceKind, RawArtifact)> = pods
            .into_iter()
            .filter(|a| {
                let Some(sel) = selector else { return false };
                let labels = a.json.get("metadata").and_then(|m| m.get("labels")).and_then(|l| l.as_object());
                let Some(labels) = labels else { return false };
                sel.iter().all(|(k, v)| {
                    v.as_str().map(|vs| labels.get(k).and_then(|lv| lv.as_str()) == Some(vs)).unwrap_or(false)
                })
            })
            .map(|a| (ResourceKind::Pod, a))
            .collect();
        debug!("{}: resolved {} child pods via label selector", controller_kind.as_str(), filtered.len());
        Ok(filtered)
    }

    async fn collect_logs(&self, collected: &mut Collected, namespace: &str, pod_names: &[String], run_deadline: &Deadline) {
        for pod_name in pod_names {
            let Some(containers) = collected
                .artifacts
                .iter()
                .find(|(k, a)| *k == ResourceKind::Pod && a.json.get("metadata").and_then(|m| m.get("name")).and_then(|n| n.as_str()) == Some(pod_name.as_str()))
                .map(|(_, a)| container_names_and_restarts(&a.json))
            else {
                continue;
            };

            for (container, restart_count) in containers {
                let key = format!("{pod_name}/{container}");
                match run_deadline
                    .race("logs", self.client.logs(namespace, pod_name, &container, 100, false, self.per_call_deadline()))
                    .await
                {
                    Ok(text) => {
                        collected.logs.insert(key, text);
                    }
                    Err(e) => collected.note_failure(&key, e),
                }

                if restart_count > 0 {
                    let prev_key = format!("{pod_name}/{container}/previous");
                    match run_deadline
                        .race("logs-previous", self.client.logs(namespace, pod_name, &container, 100, true, self.per_call_deadline()))
                        .await
                    {
                        Ok(text) => {
                            collected.logs.insert(prev_key, text);
                        }
                        Err(e) => collected.note_failure(&prev_key, e),
                    }
                }
            }
        }
    }

    async fn get_with_permit(&self, kind: &ResourceKind, namespace: &str, name: &str) -> ClusterResult<RawArtifact> {
        let _permit = self.semaphore.acquire().await;
        self.client.get(kind, namespace, name, self.per_call_deadline()).await
    }

    async fn list_with_permit(&self, kind: &ResourceKind, namespace: &str) -> ClusterResult<Vec<RawArtifact>> {
        let _permit = self.semaphore.acquire().await;
        self.client.list_namespaced(kind, namespace, self.per_call_deadline()).await
    }
}

fn collected_pod_names(collected: &Collected) -> Vec<String> {
    collected
        .artifacts
        .iter()
        .filter(|(k, _)| *k == ResourceKind::Pod)
        .filter_map(|(_, a)| a.json.get("metadata").and_then(|m| m.get("name")).and_then(|n| n.as_str()).map(str::to_string))
        .collect()
}

fn container_names_and_restarts(pod_json: &serde_json::Value) -> Vec<(String, i32)> {
    pod_json
        .get("status")
        .and_then(|s| s.get("containerStatuses"))
        .and_then(|v| v.as_array())
        .map(|statuses| {
            statuses
                .iter()
                .filter_map(|cs| {
                    let name = cs.get("name")?.as_str()?.to_string();
                    let restarts = cs.get("restartCount").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
                    Some((name, restarts))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockClusterClient;
    use serde_json::json;

    fn pod_artifact(name: &str, restarts: i32) -> RawArtifact {
        RawArtifact {
            kind: "Pod".into(),
            json: json!({
                "metadata": {"name": name, "namespace": "production"},
                "status": {"containerStatuses": [{"name": "app", "restartCount": restarts}]}
            }),
        }
    }

    #[tokio::test]
    async fn diag_collects_subject_events_and_logs() {
        let mut mock = MockClusterClient::new();
        mock.expect_get()
            .returning(|_, _, name, _| {
                let name = name.to_string();
                Box::pin(async move { Ok(pod_artifact(&name, 3)) })
            });
        mock.expect_describe().returning(|_, _, _, _| Box::pin(async { Ok("Name: x".to_string()) }));
        mock.expect_events().returning(|_, _, _| Box::pin(async { Ok(vec![]) }));
        mock.expect_logs().returning(|_, _, _, _, _, _| Box::pin(async { Ok("log line".to_string()) }));

        let cfg = Config::default();
        let collectors = Collectors::new(&mock, &cfg);
        let result = collectors.collect_diag(ResourceKind::Pod, "production", "failing-app-xyz").await.unwrap();
        assert_eq!(result.artifacts.len(), 1);
        assert!(result.logs.contains_key("failing-app-xyz/app"));
        assert!(result.logs.contains_key("failing-app-xyz/app/previous"));
    }

    #[tokio::test]
    async fn forbidden_event_source_downgrades_to_partial_error() {
        let mut mock = MockClusterClient::new();
        mock.expect_get().returning(|_, _, name, _| {
            let name = name.to_string();
            Box::pin(async move { Ok(pod_artifact(&name, 0)) })
        });
        mock.expect_describe().returning(|_, _, _, _| Box::pin(async { Ok("Name: x".to_string()) }));
        mock.expect_events()
            .returning(|_, _, _| Box::pin(async { Err(ClusterError::Forbidden("events forbidden".into())) }));
        mock.expect_logs().returning(|_, _, _, _, _, _| Box::pin(async { Ok(String::new()) }));

        let cfg = Config::default();
        let collectors = Collectors::new(&mock, &cfg);
        let result = collectors.collect_diag(ResourceKind::Pod, "production", "failing-app-xyz").await.unwrap();
        assert!(result.partial_errors.iter().any(|e| e.source == "events"));
    }

    #[tokio::test]
    async fn subject_not_found_is_fatal() {
        let mut mock = MockClusterClient::new();
        mock.expect_get()
            .returning(|_, _, _, _| Box::pin(async { Err(ClusterError::NotFound("no such pod".into())) }));

        let cfg = Config::default();
        let collectors = Collectors::new(&mock, &cfg);
        let result = collectors.collect_diag(ResourceKind::Pod, "production", "missing").await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }
}
