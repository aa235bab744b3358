//! Production `ClusterClient` backed by the `kube` crate: `Api::namespaced`/
//! `Api::all` dispatch on an `Option<&str>` namespace, with a
//! metrics.k8s.io aggregated-API path for `node_metrics`/`pod_metrics`.

use futures::future::BoxFuture;
use futures::FutureExt;
use http::Request;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Event as K8sEvent, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret,
    Service, ServiceAccount,
};
use k8s_openapi::api::discovery::v1::EndpointSlice;
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use kube::api::{ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use serde::Deserialize;

use super::{ClusterResult, Deadline, InvolvedObjectFilter, NodeTopRow, PodTopRow, RawArtifact};
use crate::errors::ClusterError;
use crate::model::ResourceKind;

#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    context: Option<String>,
}

impl KubeClusterClient {
    /// `context` overrides the kubeconfig's `current-context` when set
    /// (`--context`); `kubeconfig_path` overrides `$KUBECONFIG` (`--kubeconfig`).
    pub async fn new(kubeconfig_path: Option<&str>, context: Option<&str>) -> anyhow::Result<Self> {
        if let Some(path) = kubeconfig_path {
            std::env::set_var("KUBECONFIG", path);
        }
        let kubeconfig = Kubeconfig::read()?;
        let resolved_context = context.map(str::to_string).or_else(|| kubeconfig.current_context.clone());
        let options = KubeConfigOptions {
            context: resolved_context.clone(),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig, &options).await?;
        let client = Client::try_from(config)?;
        Ok(Self { client, context: resolved_context })
    }

    async fn fetch_list(&self, kind: &ResourceKind, namespace: &str) -> ClusterResult<Vec<RawArtifact>> {
        let lp = ListParams::default();
        macro_rules! list_as {
            ($ty:ty) => {{
                let api: Api<$ty> = Api::namespaced(self.client.clone(), namespace);
                let list = api
                    .list(&lp)
                    .await
                    .map_err(|e| ClusterError::from_kube("list", &e))?;
                list.items
                    .into_iter()
                    .map(|item| to_artifact(kind, &item))
                    .collect::<ClusterResult<Vec<_>>>()?
            }};
        }
        let out = match kind {
            ResourceKind::Pod => list_as!(Pod),
            ResourceKind::ReplicaSet => list_as!(ReplicaSet),
            ResourceKind::Deployment => list_as!(Deployment),
            ResourceKind::StatefulSet => list_as!(StatefulSet),
            ResourceKind::DaemonSet => list_as!(DaemonSet),
            ResourceKind::Job => list_as!(Job),
            ResourceKind::CronJob => list_as!(CronJob),
            ResourceKind::Service => list_as!(Service),
            ResourceKind::Ingress => list_as!(Ingress),
            ResourceKind::ConfigMap => list_as!(ConfigMap),
            ResourceKind::Secret => list_as!(Secret),
            ResourceKind::PersistentVolumeClaim => list_as!(PersistentVolumeClaim),
            ResourceKind::HorizontalPodAutoscaler => list_as!(HorizontalPodAutoscaler),
            ResourceKind::NetworkPolicy => list_as!(NetworkPolicy),
            ResourceKind::Endpoints => list_as!(EndpointSlice),
            ResourceKind::ServiceAccount => list_as!(ServiceAccount),
            ResourceKind::PersistentVolume | ResourceKind::Node => {
                return Err(ClusterError::Other(format!(
                    "{kind} is cluster-scoped; use list_namespaced only for namespaced kinds"
                )))
            }
            ResourceKind::Generic(_) => {
                return Err(ClusterError::Other(format!(
                    "generic kind {kind} requires a CRD-specific client; not collected"
                )))
            }
        };
        Ok(out)
    }

    async fn fetch_get(&self, kind: &ResourceKind, namespace: &str, name: &str) -> ClusterResult<RawArtifact> {
        macro_rules! get_as {
            ($ty:ty, $api:expr) => {{
                let item = $api
                    .get(name)
                    .await
                    .map_err(|e| ClusterError::from_kube("get", &e))?;
                to_artifact(kind, &item)?
            }};
        }
        let artifact = match kind {
            ResourceKind::Pod => get_as!(Pod, Api::<Pod>::namespaced(self.client.clone(), namespace)),
            ResourceKind::ReplicaSet => {
                get_as!(ReplicaSet, Api::<ReplicaSet>::namespaced(self.client.clone(), namespace))
            }
            ResourceKind::Deployment => {
                get_as!(Deployment, Api::<Deployment>::namespaced(self.client.clone(), namespace))
            }
            ResourceKind::StatefulSet => {
                get_as!(StatefulSet, Api::<StatefulSet>::namespaced(self.client.clone(), namespace))
            }
            ResourceKind::DaemonSet => {
                get_as!(DaemonSet, Api::<DaemonSet>::namespaced(self.client.clone(), namespace))
            }
            ResourceKind::Job => get_as!(Job, Api::<Job>::namespaced(self.client.clone(), namespace)),
            ResourceKind::CronJob => get_as!(CronJob, Api::<CronJob>::namespaced(self.client.clone(), namespace)),
            ResourceKind::Service => get_as!(Service, Api::<Service>::namespaced(self.client.clone(), namespace)),
            ResourceKind::Ingress => get_as!(Ingress, Api::<Ingress>::namespaced(self.client.clone(), namespace)),
            ResourceKind::ConfigMap => {
                get_as!(ConfigMap, Api::<ConfigMap>::namespaced(self.client.clone(), namespace))
            }
            ResourceKind::Secret => get_as!(Secret, Api::<Secret>::namespaced(self.client.clone(), namespace)),
            ResourceKind::PersistentVolumeClaim => get_as!(
                PersistentVolumeClaim,
                Api::<PersistentVolumeClaim>::namespaced(self.client.clone(), namespace)
            ),
            ResourceKind::PersistentVolume => {
                get_as!(PersistentVolume, Api::<PersistentVolume>::all(self.client.clone()))
            }
            ResourceKind::Node => get_as!(Node, Api::<Node>::all(self.client.clone())),
            ResourceKind::HorizontalPodAutoscaler => get_as!(
                HorizontalPodAutoscaler,
                Api::<HorizontalPodAutoscaler>::namespaced(self.client.clone(), namespace)
            ),
            ResourceKind::NetworkPolicy => {
                get_as!(NetworkPolicy, Api::<NetworkPolicy>::namespaced(self.client.clone(), namespace))
            }
            ResourceKind::Endpoints => {
                get_as!(EndpointSlice, Api::<EndpointSlice>::namespaced(self.client.clone(), namespace))
            }
            ResourceKind::ServiceAccount => get_as!(
                ServiceAccount,
                Api::<ServiceAccount>::namespaced(self.client.clone(), namespace)
            ),
            ResourceKind::Generic(_) => {
                return Err(ClusterError::Other(format!(
                    "generic kind {kind} requires a CRD-specific client; not collected"
                )))
            }
        };
        Ok(artifact)
    }
}

/// Verbose text summary built off the same JSON `fetch_get` returns: name,
/// namespace, phase, and conditions, one line each.
fn describe_text(kind: &ResourceKind, json: &serde_json::Value) -> String {
    let name = json.pointer("/metadata/name").and_then(|v| v.as_str()).unwrap_or("unknown");
    let namespace = json.pointer("/metadata/namespace").and_then(|v| v.as_str()).unwrap_or("default");
    let mut out = format!("Name:      {name}\nNamespace: {namespace}\nKind:      {kind}\n");
    if let Some(phase) = json.pointer("/status/phase").and_then(|v| v.as_str()) {
        out.push_str(&format!("Phase:     {phase}\n"));
    }
    if let Some(conditions) = json.pointer("/status/conditions").and_then(|v| v.as_array()) {
        out.push_str("Conditions:\n");
        for c in conditions {
            let type_ = c.get("type").and_then(|v| v.as_str()).unwrap_or("");
            let status = c.get("status").and_then(|v| v.as_str()).unwrap_or("");
            let reason = c.get("reason").and_then(|v| v.as_str()).unwrap_or("");
            if reason.is_empty() {
                out.push_str(&format!("  {type_}={status}\n"));
            } else {
                out.push_str(&format!("  {type_}={status} ({reason})\n"));
            }
        }
    }
    out
}

fn to_artifact<T: serde::Serialize>(kind: &ResourceKind, item: &T) -> ClusterResult<RawArtifact> {
    let json = serde_json::to_value(item).map_err(|e| ClusterError::Other(format!("serialize: {e}")))?;
    Ok(RawArtifact {
        kind: kind.to_string(),
        json,
    })
}

impl super::ClusterClient for KubeClusterClient {
    fn list_namespaced<'a>(
        &'a self,
        kind: &'a ResourceKind,
        namespace: &'a str,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<Vec<RawArtifact>>> {
        async move { deadline.race("list_namespaced", self.fetch_list(kind, namespace)).await }.boxed()
    }

    fn get<'a>(
        &'a self,
        kind: &'a ResourceKind,
        namespace: &'a str,
        name: &'a str,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<RawArtifact>> {
        async move { deadline.race("get", self.fetch_get(kind, namespace, name)).await }.boxed()
    }

    fn describe<'a>(
        &'a self,
        kind: &'a ResourceKind,
        namespace: &'a str,
        name: &'a str,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<String>> {
        async move {
            deadline
                .race("describe", async {
                    let artifact = self.fetch_get(kind, namespace, name).await?;
                    Ok(describe_text(kind, &artifact.json))
                })
                .await
        }
        .boxed()
    }

    fn events<'a>(
        &'a self,
        namespace: &'a str,
        filter: &'a InvolvedObjectFilter,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<Vec<RawArtifact>>> {
        async move {
            deadline
                .race("events", async {
                    let api: Api<K8sEvent> = Api::namespaced(self.client.clone(), namespace);
                    let list = api
                        .list(&ListParams::default().limit(200))
                        .await
                        .map_err(|e| ClusterError::from_kube("events", &e))?;
                    let out = list
                        .items
                        .into_iter()
                        .filter(|ev| {
                            ev.involved_object.kind.as_deref() == Some(filter.kind.as_str())
                                && filter.names.iter().any(|n| ev.involved_object.name.as_deref() == Some(n))
                        })
                        .map(|ev| to_artifact(&ResourceKind::Generic("Event".into()), &ev))
                        .collect::<ClusterResult<Vec<_>>>()?;
                    Ok(out)
                })
                .await
        }
        .boxed()
    }

    fn logs<'a>(
        &'a self,
        namespace: &'a str,
        pod: &'a str,
        container: &'a str,
        tail: i64,
        previous: bool,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<String>> {
        async move {
            deadline
                .race("logs", async {
                    let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
                    let lp = LogParams {
                        container: Some(container.to_string()),
                        tail_lines: Some(tail),
                        previous,
                        ..Default::default()
                    };
                    api.logs(pod, &lp).await.map_err(|e| ClusterError::from_kube("logs", &e))
                })
                .await
        }
        .boxed()
    }

    fn top_pods<'a>(
        &'a self,
        namespace: &'a str,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<Vec<PodTopRow>>> {
        async move {
            deadline
                .race("top_pods", async {
                    let path = format!("/apis/metrics.k8s.io/v1beta1/namespaces/{namespace}/pods");
                    let req = Request::builder()
                        .method("GET")
                        .uri(path)
                        .body(vec![])
                        .map_err(|e| ClusterError::Other(format!("build request: {e}")))?;
                    let list: PodMetricsList = self
                        .client
                        .request(req)
                        .await
                        .map_err(|e| ClusterError::from_kube("top_pods", &e))?;
                    let mut out = Vec::new();
                    for pm in list.items {
                        let ns = pm.metadata.namespace.unwrap_or_default();
                        for c in pm.containers {
                            let cpu = c.usage.get("cpu").map(String::as_str).unwrap_or("0");
                            let mem = c.usage.get("memory").map(String::as_str).unwrap_or("0");
                            out.push(PodTopRow {
                                namespace: ns.clone(),
                                name: pm.metadata.name.clone(),
                                cpu_millicores: crate::parsers::quantity::parse_cpu_millicores(cpu).unwrap_or(0),
                                memory_bytes: crate::parsers::quantity::parse_memory_bytes(mem).unwrap_or(0),
                            });
                        }
                    }
                    Ok(out)
                })
                .await
        }
        .boxed()
    }

    fn top_nodes<'a>(&'a self, deadline: Deadline) -> BoxFuture<'a, ClusterResult<Vec<NodeTopRow>>> {
        async move {
            deadline
                .race("top_nodes", async {
                    let req = Request::builder()
                        .method("GET")
                        .uri("/apis/metrics.k8s.io/v1beta1/nodes")
                        .body(vec![])
                        .map_err(|e| ClusterError::Other(format!("build request: {e}")))?;
                    let list: NodeMetricsList = self
                        .client
                        .request(req)
                        .await
                        .map_err(|e| ClusterError::from_kube("top_nodes", &e))?;
                    Ok(list
                        .items
                        .into_iter()
                        .map(|m| {
                            let cpu = m.usage.get("cpu").map(String::as_str).unwrap_or("0");
                            let mem = m.usage.get("memory").map(String::as_str).unwrap_or("0");
                            NodeTopRow {
                                name: m.metadata.name,
                                cpu_millicores: crate::parsers::quantity::parse_cpu_millicores(cpu).unwrap_or(0),
                                memory_bytes: crate::parsers::quantity::parse_memory_bytes(mem).unwrap_or(0),
                            }
                        })
                        .collect())
                })
                .await
        }
        .boxed()
    }

    fn raw_get<'a>(&'a self, path: &'a str, deadline: Deadline) -> BoxFuture<'a, ClusterResult<String>> {
        async move {
            deadline
                .race("raw_get", async {
                    let req = Request::builder()
                        .method("GET")
                        .uri(path)
                        .body(vec![])
                        .map_err(|e| ClusterError::Other(format!("build request: {e}")))?;
                    self.client
                        .request_text(req)
                        .await
                        .map_err(|e| ClusterError::from_kube("raw_get", &e))
                })
                .await
        }
        .boxed()
    }

    fn current_context(&self) -> Option<String> {
        self.context.clone()
    }

    fn can_i<'a>(
        &'a self,
        verb: &'a str,
        resource: &'a str,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, ClusterResult<bool>> {
        async move {
            use k8s_openapi::api::authorization::v1::{
                ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
            };
            let review = SelfSubjectAccessReview {
                spec: SelfSubjectAccessReviewSpec {
                    resource_attributes: Some(ResourceAttributes {
                        verb: Some(verb.to_string()),
                        resource: Some(resource.to_string()),
                        namespace: namespace.map(|s| s.to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            };
            let api: Api<SelfSubjectAccessReview> = Api::all(self.client.clone());
            let result = api
                .create(&kube::api::PostParams::default(), &review)
                .await
                .map_err(|e| ClusterError::from_kube("can_i", &e))?;
            Ok(result.status.map(|s| s.allowed).unwrap_or(false))
        }
        .boxed()
    }
}

#[derive(Deserialize)]
struct NodeMetricsList {
    items: Vec<NodeMetricsEntry>,
}

#[derive(Deserialize)]
struct NodeMetricsEntry {
    metadata: MetaName,
    usage: std::collections::HashMap<String, String>,
}

#[derive(Deserialize)]
struct PodMetricsList {
    items: Vec<PodMetricsEntry>,
}

#[derive(Deserialize)]
struct PodMetricsEntry {
    metadata: MetaNameNamespace,
    containers: Vec<ContainerMetricsEntry>,
}

#[derive(Deserialize)]
struct ContainerMetricsEntry {
    usage: std::collections::HashMap<String, String>,
}

#[derive(Deserialize)]
struct MetaName {
    name: String,
}

#[derive(Deserialize)]
struct MetaNameNamespace {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").field("context", &self.context).finish()
    }
}
