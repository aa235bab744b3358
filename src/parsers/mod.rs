//! Deterministic, pure functions from raw artifact JSON to typed records.
//! Parsers are tolerant to unknown fields and missing optional sections
//! (`as_deref().unwrap_or(...)` throughout) and target a generic
//! `serde_json::Value` instead of strongly-typed `k8s_openapi` structs, since
//! the closed `ResourceKind` set must also cover `Generic` CRDs.

pub mod quantity;
pub mod certs;
pub mod events;
pub mod metrics_text;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cluster::RawArtifact;
use crate::model::{Condition, EventKind, EventRecord, ResourceKind, ResourceRecord};

/// Known container-lifecycle waiting/terminated reasons the scorer keys off.
pub const KNOWN_WAITING_REASONS: &[&str] = &[
    "CrashLoopBackOff",
    "ImagePullBackOff",
    "ErrImagePull",
    "ContainerCreating",
    "CreateContainerConfigError",
];

#[derive(Debug, Clone)]
pub struct ContainerStatus {
    pub name: String,
    pub restart_count: i32,
    pub waiting_reason: Option<String>,
    pub waiting_message: Option<String>,
    pub terminated_reason: Option<String>,
    pub terminated_exit_code: Option<i32>,
    pub ready: bool,
}

fn s(v: &Value, path: &[&str]) -> Option<String> {
    let mut cur = v;
    for p in path {
        cur = cur.get(p)?;
    }
    cur.as_str().map(|x| x.to_string())
}

fn obj<'a>(v: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = v;
    for p in path {
        cur = cur.get(p)?;
    }
    Some(cur)
}

/// Parse a single raw artifact into a `ResourceRecord`. Unknown kinds fall
/// back to the `Generic` conditions-based handling (§4.5's fallback reads
/// `status.conditions` directly off `properties`, so no kind-specific
/// extraction is required here beyond what's common to every object).
pub fn parse_record(artifact: &RawArtifact, kind: ResourceKind) -> ResourceRecord {
    let json = &artifact.json;
    let namespace = s(json, &["metadata", "namespace"]).unwrap_or_else(|| "default".to_string());
    let name = s(json, &["metadata", "name"]).unwrap_or_else(|| "unknown".to_string());

    let mut record = ResourceRecord::new(kind.clone(), namespace, name);

    if let Some(labels) = obj(json, &["metadata", "labels"]).and_then(|v| v.as_object()) {
        for (k, v) in labels {
            if let Some(vs) = v.as_str() {
                record.labels.insert(k.clone(), vs.to_string());
            }
        }
    }
    if let Some(annotations) = obj(json, &["metadata", "annotations"]).and_then(|v| v.as_object()) {
        for (k, v) in annotations {
            if let Some(vs) = v.as_str() {
                record.annotations.insert(k.clone(), vs.to_string());
            }
        }
    }

    record.phase = s(json, &["status", "phase"]);

    if let Some(conditions) = obj(json, &["status", "conditions"]).and_then(|v| v.as_array()) {
        for c in conditions {
            let type_ = s(c, &["type"]).unwrap_or_default();
            let status = s(c, &["status"]).unwrap_or_default();
            if type_ == "Ready" {
                record.ready = Some(status == "True");
            }
            record.conditions.push(Condition {
                type_,
                status,
                reason: s(c, &["reason"]),
                message: s(c, &["message"]),
            });
        }
    }

    // owner references: kept as (kind, name) pairs for the graph builder.
    if let Some(refs) = obj(json, &["metadata", "ownerReferences"]).and_then(|v| v.as_array()) {
        let owners: Vec<Value> = refs.clone();
        record.set_property("ownerReferences", Value::Array(owners));
    }

    if let Some(node_name) = s(json, &["spec", "nodeName"]) {
        record.set_property("nodeName", Value::String(node_name));
    }
    if let Some(sa) = s(json, &["spec", "serviceAccountName"]) {
        record.set_property("serviceAccountName", Value::String(sa));
    }
    if let Some(selector) = obj(json, &["spec", "selector"]).cloned() {
        record.set_property("selector", selector);
    }
    if let Some(volumes) = obj(json, &["spec", "volumes"]).cloned() {
        record.set_property("volumes", volumes);
    }
    if let Some(scale_target) = obj(json, &["spec", "scaleTargetRef"]).cloned() {
        record.set_property("scaleTargetRef", scale_target);
    }
    if let Some(volume_name) = s(json, &["spec", "volumeName"]) {
        record.set_property("volumeName", Value::String(volume_name));
    }
    if let Some(capacity) = obj(json, &["status", "capacity"]).cloned() {
        record.set_property("capacity", capacity);
    }
    if let Some(rules) = obj(json, &["spec", "rules"]).cloned() {
        record.set_property("ingressRules", rules);
    }
    if let Some(default_backend) = obj(json, &["spec", "defaultBackend"]).cloned() {
        record.set_property("defaultBackend", default_backend);
    }
    if let Some(tls) = obj(json, &["spec", "tls"]).cloned() {
        record.set_property("ingressTls", tls);
    }
    if let Some(pod_selector) = obj(json, &["spec", "podSelector"]).cloned() {
        record.set_property("podSelector", pod_selector);
    }
    if let Some(secret_type) = s(json, &["type"]) {
        record.set_property("secretType", Value::String(secret_type));
    }
    if let Some(data) = obj(json, &["data"]).cloned() {
        record.set_property("data", data);
    }

    if let Some(env_refs) = container_env_references(json) {
        record.set_property("envReferences", env_refs);
    }

    if let Some(statuses) = container_statuses(json) {
        record.set_property(
            "containerStatuses",
            serde_json::to_value(&statuses).unwrap_or(Value::Null),
        );
    }
    if let Some(requests_limits) = container_resources(json) {
        record.set_property("containerResources", requests_limits);
    }

    record
}

/// Extracts init + regular container statuses (waiting/terminated reason,
/// restart count), walking `initContainerStatuses` chained with
/// `containerStatuses`.
pub fn container_statuses(json: &Value) -> Option<Vec<ContainerStatus>> {
    let init = obj(json, &["status", "initContainerStatuses"])
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let main = obj(json, &["status", "containerStatuses"])
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    if init.is_empty() && main.is_empty() {
        return None;
    }
    let mut out = Vec::new();
    for cs in init.iter().chain(main.iter()) {
        let name = s(cs, &["name"]).unwrap_or_default();
        let restart_count = cs.get("restartCount").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
        let ready = cs.get("ready").and_then(|v| v.as_bool()).unwrap_or(false);
        let waiting_reason = s(cs, &["state", "waiting", "reason"]);
        let waiting_message = s(cs, &["state", "waiting", "message"]);
        let terminated_reason = s(cs, &["state", "terminated", "reason"]);
        let terminated_exit_code = cs
            .get("state")
            .and_then(|v| v.get("terminated"))
            .and_then(|v| v.get("exitCode"))
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        out.push(ContainerStatus {
            name,
            restart_count,
            waiting_reason,
            waiting_message,
            terminated_reason,
            terminated_exit_code,
            ready,
        });
    }
    Some(out)
}

impl serde::Serialize for ContainerStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut st = serializer.serialize_struct("ContainerStatus", 7)?;
        st.serialize_field("name", &self.name)?;
        st.serialize_field("restart_count", &self.restart_count)?;
        st.serialize_field("waiting_reason", &self.waiting_reason)?;
        st.serialize_field("waiting_message", &self.waiting_message)?;
        st.serialize_field("terminated_reason", &self.terminated_reason)?;
        st.serialize_field("terminated_exit_code", &self.terminated_exit_code)?;
        st.serialize_field("ready", &self.ready)?;
        st.end()
    }
}

/// Per-container requests/limits (cpu millicores, memory bytes), keyed by
/// container name, for the scorer and `top`'s capacity forecast.
fn container_resources(json: &Value) -> Option<Value> {
    let containers = obj(json, &["spec", "containers"]).and_then(|v| v.as_array())?;
    let mut map = serde_json::Map::new();
    for c in containers {
        let name = s(c, &["name"]).unwrap_or_default();
        let cpu_request = s(c, &["resources", "requests", "cpu"]);
        let mem_request = s(c, &["resources", "requests", "memory"]);
        let cpu_limit = s(c, &["resources", "limits", "cpu"]);
        let mem_limit = s(c, &["resources", "limits", "memory"]);
        map.insert(
            name,
            serde_json::json!({
                "cpu_request_m": cpu_request.as_deref().and_then(quantity::parse_cpu_millicores),
                "mem_request_bytes": mem_request.as_deref().and_then(quantity::parse_memory_bytes),
                "cpu_limit_m": cpu_limit.as_deref().and_then(quantity::parse_cpu_millicores),
                "mem_limit_bytes": mem_limit.as_deref().and_then(quantity::parse_memory_bytes),
            }),
        );
    }
    Some(Value::Object(map))
}

/// `configMapRef`/`secretRef` from each container's `envFrom`, plus
/// `configMapKeyRef`/`secretKeyRef` from each `env[].valueFrom`, as
/// `{"kind", "name"}` pairs. These feed the same `Mounts`-style edges as
/// `spec.volumes` references, since both are a pod depending on a
/// ConfigMap/Secret's data.
fn container_env_references(json: &Value) -> Option<Value> {
    let containers = obj(json, &["spec", "containers"]).and_then(|v| v.as_array())?;
    let mut refs = Vec::new();
    for c in containers {
        if let Some(env_from) = c.get("envFrom").and_then(|v| v.as_array()) {
            for ef in env_from {
                if let Some(n) = ef.get("configMapRef").and_then(|r| r.get("name")).and_then(|n| n.as_str()) {
                    refs.push(serde_json::json!({"kind": "ConfigMap", "name": n}));
                }
                if let Some(n) = ef.get("secretRef").and_then(|r| r.get("name")).and_then(|n| n.as_str()) {
                    refs.push(serde_json::json!({"kind": "Secret", "name": n}));
                }
            }
        }
        if let Some(env) = c.get("env").and_then(|v| v.as_array()) {
            for e in env {
                let Some(value_from) = e.get("valueFrom") else { continue };
                if let Some(n) = value_from.get("configMapKeyRef").and_then(|r| r.get("name")).and_then(|n| n.as_str()) {
                    refs.push(serde_json::json!({"kind": "ConfigMap", "name": n}));
                }
                if let Some(n) = value_from.get("secretKeyRef").and_then(|r| r.get("name")).and_then(|n| n.as_str()) {
                    refs.push(serde_json::json!({"kind": "Secret", "name": n}));
                }
            }
        }
    }
    if refs.is_empty() {
        None
    } else {
        Some(Value::Array(refs))
    }
}

/// Owner references as `(kind, name)` pairs, read back off `properties`.
pub fn owner_references(record: &ResourceRecord) -> Vec<(String, String)> {
    record
        .property("ownerReferences")
        .and_then(|v| v.as_array())
        .map(|refs| {
            refs.iter()
                .filter_map(|r| {
                    let kind = r.get("kind")?.as_str()?.to_string();
                    let name = r.get("name")?.as_str()?.to_string();
                    Some((kind, name))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Volume-derived mount targets: configmap/secret/pvc names referenced by a
/// pod's `spec.volumes`, plus envFrom/valueFrom references on containers.
pub fn volume_mount_targets(record: &ResourceRecord) -> Vec<(MountKind, String)> {
    let mut out = Vec::new();
    if let Some(volumes) = record.property("volumes").and_then(|v| v.as_array()) {
        for v in volumes {
            if let Some(n) = v.get("configMap").and_then(|c| c.get("name")).and_then(|n| n.as_str()) {
                out.push((MountKind::ConfigMap, n.to_string()));
            }
            if let Some(n) = v.get("secret").and_then(|c| c.get("secretName")).and_then(|n| n.as_str()) {
                out.push((MountKind::Secret, n.to_string()));
            }
            if let Some(n) = v
                .get("persistentVolumeClaim")
                .and_then(|c| c.get("claimName"))
                .and_then(|n| n.as_str())
            {
                out.push((MountKind::Pvc, n.to_string()));
            }
        }
    }
    if let Some(refs) = record.property("envReferences").and_then(|v| v.as_array()) {
        for r in refs {
            let kind = r.get("kind").and_then(|v| v.as_str());
            let name = r.get("name").and_then(|v| v.as_str());
            if let (Some(kind), Some(name)) = (kind, name) {
                match kind {
                    "ConfigMap" => out.push((MountKind::ConfigMap, name.to_string())),
                    "Secret" => out.push((MountKind::Secret, name.to_string())),
                    _ => {}
                }
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    ConfigMap,
    Secret,
    Pvc,
}

/// Parse a raw Event artifact into an `EventRecord`.
pub fn parse_event(json: &Value) -> Option<EventRecord> {
    let type_ = match s(json, &["type"]).as_deref() {
        Some("Warning") => EventKind::Warning,
        _ => EventKind::Normal,
    };
    let reason = s(json, &["reason"]).unwrap_or_else(|| "Unknown".to_string());
    let message = s(json, &["message"]).unwrap_or_default();
    let count = json.get("count").and_then(|v| v.as_i64()).unwrap_or(1) as i32;
    let first_timestamp = parse_time(json, &["firstTimestamp"]).unwrap_or_else(Utc::now);
    let last_timestamp = parse_time(json, &["lastTimestamp"])
        .or_else(|| parse_time(json, &["eventTime"]))
        .unwrap_or(first_timestamp);
    let involved_object = s(json, &["involvedObject", "name"]).unwrap_or_default();
    Some(EventRecord {
        type_,
        reason,
        message,
        count,
        first_timestamp,
        last_timestamp,
        involved_object,
    })
}

fn parse_time(json: &Value, path: &[&str]) -> Option<DateTime<Utc>> {
    s(json, path).and_then(|t| DateTime::parse_from_rfc3339(&t).ok()).map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_crashloopbackoff_container_status() {
        let json = serde_json::json!({
            "metadata": {"name": "failing-app-xyz", "namespace": "production"},
            "status": {
                "phase": "Running",
                "containerStatuses": [{
                    "name": "app",
                    "restartCount": 15,
                    "ready": false,
                    "state": {"waiting": {"reason": "CrashLoopBackOff", "message": "back-off 5m0s"}}
                }]
            }
        });
        let artifact = RawArtifact { kind: "Pod".into(), json: json.clone() };
        let record = parse_record(&artifact, ResourceKind::Pod);
        assert_eq!(record.phase.as_deref(), Some("Running"));
        let statuses = container_statuses(&json).unwrap();
        assert_eq!(statuses[0].waiting_reason.as_deref(), Some("CrashLoopBackOff"));
        assert_eq!(statuses[0].restart_count, 15);
    }

    #[test]
    fn extracts_env_from_and_value_from_references() {
        let json = serde_json::json!({
            "metadata": {"name": "web-1", "namespace": "production"},
            "spec": {
                "containers": [{
                    "name": "app",
                    "envFrom": [{"configMapRef": {"name": "app-config"}}],
                    "env": [{"name": "DB_PASSWORD", "valueFrom": {"secretKeyRef": {"name": "db-secret", "key": "password"}}}]
                }]
            }
        });
        let artifact = RawArtifact { kind: "Pod".into(), json };
        let record = parse_record(&artifact, ResourceKind::Pod);
        let targets = volume_mount_targets(&record);
        assert!(targets.contains(&(MountKind::ConfigMap, "app-config".to_string())));
        assert!(targets.contains(&(MountKind::Secret, "db-secret".to_string())));
    }

    #[test]
    fn parses_event_with_coalesced_count() {
        let json = serde_json::json!({
            "type": "Warning",
            "reason": "BackOff",
            "message": "Back-off restarting failed container",
            "count": 20,
            "firstTimestamp": "2026-07-28T00:00:00Z",
            "lastTimestamp": "2026-07-28T00:02:00Z",
            "involvedObject": {"name": "failing-app-xyz"}
        });
        let ev = parse_event(&json).unwrap();
        assert_eq!(ev.count, 20);
        assert_eq!(ev.reason, "BackOff");
    }
}
