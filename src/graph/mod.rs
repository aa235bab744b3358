//! GraphBuilder: constructs the directed labeled graph per the fixed
//! ruleset in spec §4.4.

mod render;

pub use render::{render_tree, TreeOptions};

use crate::model::{EdgeLabel, Graph, ResourceKind, ResourceRecord};
use crate::parsers::{owner_references, volume_mount_targets, MountKind};
use uuid::Uuid;

/// Builds edges over an already-populated `Graph` (vertices added by the
/// caller via collected records). Matches vertices by `(kind, namespace,
/// name)` since raw owner references and selectors only carry names, not
/// uids.
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn build_edges(graph: &mut Graph) {
        let index = index_vertices(graph);

        let pairs: Vec<(Uuid, ResourceRecord)> = graph.vertices().map(|r| (r.uid, r.clone())).collect();

        for (uid, record) in &pairs {
            Self::link_owner_references(graph, &index, *uid, record);
            Self::link_pod_node(graph, *uid, record);
            Self::link_pod_mounts(graph, &index, *uid, record);
            Self::link_pod_service_account(graph, &index, *uid, record);
            Self::link_pvc_pv(graph, &index, *uid, record);
            Self::link_hpa_target(graph, &index, *uid, record);
        }

        // Selector-based edges need the full pod set per namespace, done
        // separately from the per-vertex pass above.
        Self::link_selectors(graph, &index, &pairs);
        Self::link_ingress_services(graph, &index, &pairs);
        Self::link_fallback_controller_selectors(graph, &index, &pairs);
    }

    fn link_owner_references(graph: &mut Graph, index: &VertexIndex, uid: Uuid, record: &ResourceRecord) {
        for (owner_kind, owner_name) in owner_references(record) {
            let owner_kind = ResourceKind::from_wire(&owner_kind);
            if let Some(&owner_uid) = index.get(&(owner_kind, record.namespace.clone(), owner_name)) {
                graph.add_edge(owner_uid, uid, EdgeLabel::Owns);
            }
        }
    }

    fn link_pod_node(graph: &mut Graph, uid: Uuid, record: &ResourceRecord) {
        if record.kind != ResourceKind::Pod {
            return;
        }
        let Some(node_name) = record.property("nodeName").and_then(|v| v.as_str()) else { return };
        // Node vertices are cluster-scoped; namespace is ignored for the lookup.
        if let Some(node_uid) = graph
            .vertices()
            .find(|r| r.kind == ResourceKind::Node && r.name == node_name)
            .map(|r| r.uid)
        {
            graph.add_edge(uid, node_uid, EdgeLabel::ScheduledOn);
        }
    }

    fn link_pod_mounts(graph: &mut Graph, index: &VertexIndex, uid: Uuid, record: &ResourceRecord) {
        if record.kind != ResourceKind::Pod {
            return;
        }
        for (kind, name) in volume_mount_targets(record) {
            let target_kind = match kind {
                MountKind::ConfigMap => ResourceKind::ConfigMap,
                MountKind::Secret => ResourceKind::Secret,
                MountKind::Pvc => ResourceKind::PersistentVolumeClaim,
            };
            if let Some(&target_uid) = index.get(&(target_kind, record.namespace.clone(), name)) {
                graph.add_edge(uid, target_uid, EdgeLabel::Mounts);
            }
        }
    }

    fn link_pod_service_account(graph: &mut Graph, index: &VertexIndex, uid: Uuid, record: &ResourceRecord) {
        if record.kind != ResourceKind::Pod {
            return;
        }
        let Some(sa) = record.property("serviceAccountName").and_then(|v| v.as_str()) else { return };
        if let Some(&sa_uid) = index.get(&(ResourceKind::ServiceAccount, record.namespace.clone(), sa.to_string())) {
            graph.add_edge(uid, sa_uid, EdgeLabel::References);
        }
    }

    fn link_pvc_pv(graph: &mut Graph, index: &VertexIndex, uid: Uuid, record: &ResourceRecord) {
        if record.kind != ResourceKind::PersistentVolumeClaim {
            return;
        }
        let Some(pv_name) = record.property("volumeName").and_then(|v| v.as_str()) else { return };
        // PVs are cluster-scoped; search by kind+name only.
        let _ = index;
        if let Some(pv_uid) = graph
            .vertices()
            .find(|r| r.kind == ResourceKind::PersistentVolume && r.name == pv_name)
            .map(|r| r.uid)
        {
            graph.add_edge(uid, pv_uid, EdgeLabel::BindsTo);
        }
    }

    fn link_hpa_target(graph: &mut Graph, index: &VertexIndex, uid: Uuid, record: &ResourceRecord) {
        if record.kind != ResourceKind::HorizontalPodAutoscaler {
            return;
        }
        let Some(target) = record.property("scaleTargetRef") else { return };
        let Some(kind_str) = target.get("kind").and_then(|v| v.as_str()) else { return };
        let Some(name) = target.get("name").and_then(|v| v.as_str()) else { return };
        let kind = ResourceKind::from_wire(kind_str);
        if let Some(&target_uid) = index.get(&(kind, record.namespace.clone(), name.to_string())) {
            graph.add_edge(uid, target_uid, EdgeLabel::References);
        }
    }

    /// Service→Pod and NetworkPolicy→Pod via label-subset containment;
    /// empty selector selects none (spec §4.4).
    fn link_selectors(graph: &mut Graph, _index: &VertexIndex, pairs: &[(Uuid, ResourceRecord)]) {
        let pods: Vec<&(Uuid, ResourceRecord)> =
            pairs.iter().filter(|(_, r)| r.kind == ResourceKind::Pod).collect();

        for (uid, record) in pairs {
            let (selector_key, label, is_networkpolicy) = match record.kind {
                ResourceKind::Service => ("selector", EdgeLabel::Selects, false),
                ResourceKind::NetworkPolicy => ("podSelector", EdgeLabel::Selects, true),
                _ => continue,
            };
            let selector = if is_networkpolicy {
                record
                    .property(selector_key)
                    .and_then(|v| v.get("matchLabels"))
                    .and_then(|v| v.as_object())
            } else {
                record.property(selector_key).and_then(|v| v.as_object())
            };
            let Some(selector) = selector else { continue };
            if selector.is_empty() {
                continue;
            }
            for (pod_uid, pod) in &pods {
                if pod.namespace != record.namespace {
                    continue;
                }
                let matches = selector.iter().all(|(k, v)| {
                    v.as_str().map(|vs| pod.labels.get(k).map(|pv| pv == vs).unwrap_or(false)).unwrap_or(false)
                });
                if matches {
                    graph.add_edge(*uid, *pod_uid, label);
                }
            }
        }
    }

    /// Ingress→Service via `spec.rules[*].http.paths[*].backend.service.name`
    /// and `spec.defaultBackend`.
    fn link_ingress_services(graph: &mut Graph, index: &VertexIndex, pairs: &[(Uuid, ResourceRecord)]) {
        for (uid, record) in pairs {
            if record.kind != ResourceKind::Ingress {
                continue;
            }
            let mut service_names: Vec<String> = Vec::new();
            if let Some(rules) = record.property("ingressRules").and_then(|v| v.as_array()) {
                for rule in rules {
                    if let Some(paths) = rule.get("http").and_then(|h| h.get("paths")).and_then(|p| p.as_array()) {
                        for path in paths {
                            if let Some(name) =
                                path.get("backend").and_then(|b| b.get("service")).and_then(|s| s.get("name")).and_then(|n| n.as_str())
                            {
                                service_names.push(name.to_string());
                            }
                        }
                    }
                }
            }
            if let Some(name) = record
                .property("defaultBackend")
                .and_then(|b| b.get("service"))
                .and_then(|s| s.get("name"))
                .and_then(|n| n.as_str())
            {
                service_names.push(name.to_string());
            }
            for name in service_names {
                if let Some(&svc_uid) = index.get(&(ResourceKind::Service, record.namespace.clone(), name)) {
                    graph.add_edge(*uid, svc_uid, EdgeLabel::References);
                }
            }
        }
    }

    /// Fallback owner-reference-less controller→pod linking via
    /// label-selector match, used when owner refs are absent (spec §4.4).
    fn link_fallback_controller_selectors(graph: &mut Graph, _index: &VertexIndex, pairs: &[(Uuid, ResourceRecord)]) {
        let pods: Vec<&(Uuid, ResourceRecord)> =
            pairs.iter().filter(|(_, r)| r.kind == ResourceKind::Pod).collect();

        for (uid, record) in pairs {
            if !record.kind.is_controller() {
                continue;
            }
            // Already linked via ownerReferences if any child declares one.
            let has_owns_edge = graph
                .bfs(record.uid, true)
                .into_iter()
                .any(|e| e.from == record.uid && e.label == EdgeLabel::Owns);
            if has_owns_edge {
                continue;
            }
            let Some(selector) = record.property("selector").and_then(|v| v.get("matchLabels")).and_then(|v| v.as_object()) else {
                continue;
            };
            if selector.is_empty() {
                continue;
            }
            for (pod_uid, pod) in &pods {
                if pod.namespace != record.namespace {
                    continue;
                }
                let matches = selector.iter().all(|(k, v)| {
                    v.as_str().map(|vs| pod.labels.get(k).map(|pv| pv == vs).unwrap_or(false)).unwrap_or(false)
                });
                if matches {
                    graph.add_edge(*uid, *pod_uid, EdgeLabel::Owns);
                }
            }
        }
    }
}

type VertexIndex = std::collections::HashMap<(ResourceKind, String, String), Uuid>;

fn index_vertices(graph: &Graph) -> VertexIndex {
    graph
        .vertices()
        .map(|r| ((r.kind.clone(), r.namespace.clone(), r.name.clone()), r.uid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(ns: &str, name: &str, labels: &[(&str, &str)]) -> ResourceRecord {
        let mut r = ResourceRecord::new(ResourceKind::Pod, ns, name);
        for (k, v) in labels {
            r.labels.insert(k.to_string(), v.to_string());
        }
        r
    }

    fn service(ns: &str, name: &str, selector: &[(&str, &str)]) -> ResourceRecord {
        let mut r = ResourceRecord::new(ResourceKind::Service, ns, name);
        let mut map = serde_json::Map::new();
        for (k, v) in selector {
            map.insert(k.to_string(), serde_json::Value::String(v.to_string()));
        }
        r.set_property("selector", serde_json::Value::Object(map));
        r
    }

    #[test]
    fn orphan_service_selects_nothing_scenario_c() {
        let mut g = Graph::new();
        let svc_uid = g.add_vertex(service("default", "orphan-service", &[("app", "non-existent-app")]));
        g.add_vertex(pod("default", "lonely-pod", &[("app", "lonely-app")]));
        GraphBuilder::build_edges(&mut g);
        let edges = g.bfs(svc_uid, true);
        assert_eq!(edges.len(), 0);
    }

    #[test]
    fn service_selects_matching_pods() {
        let mut g = Graph::new();
        let svc_uid = g.add_vertex(service("default", "web", &[("app", "web")]));
        let pod_uid = g.add_vertex(pod("default", "web-1", &[("app", "web")]));
        GraphBuilder::build_edges(&mut g);
        let edges = g.bfs(svc_uid, true);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, pod_uid);
        assert_eq!(edges[0].label, EdgeLabel::Selects);
    }

    #[test]
    fn empty_selector_selects_none() {
        let mut g = Graph::new();
        let svc_uid = g.add_vertex(service("default", "headless-like", &[]));
        g.add_vertex(pod("default", "any-pod", &[("app", "x")]));
        GraphBuilder::build_edges(&mut g);
        assert_eq!(g.bfs(svc_uid, true).len(), 0);
    }
}
