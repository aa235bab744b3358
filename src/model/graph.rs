use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

use super::record::ResourceRecord;

/// Closed set of edge labels (spec §3). Edges carry no weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeLabel {
    Owns,
    Selects,
    Mounts,
    BindsTo,
    ScheduledOn,
    References,
}

impl EdgeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::Owns => "owns",
            EdgeLabel::Selects => "selects",
            EdgeLabel::Mounts => "mounts",
            EdgeLabel::BindsTo => "binds-to",
            EdgeLabel::ScheduledOn => "scheduled-on",
            EdgeLabel::References => "references",
        }
    }
}

#[derive(Debug, Clone)]
struct Edge {
    from: Uuid,
    to: Uuid,
    label: EdgeLabel,
}

/// Directed labeled graph of resources. Vertices are keyed by `uid`
/// (spec §3); BFS traversal visits each node at most once per direction
/// (spec invariant 4), tolerating cycles outside the `owns` subgraph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: HashMap<Uuid, ResourceRecord>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, record: ResourceRecord) -> Uuid {
        let uid = record.uid;
        self.vertices.insert(uid, record);
        uid
    }

    pub fn add_edge(&mut self, from: Uuid, to: Uuid, label: EdgeLabel) {
        if from == to {
            return;
        }
        if self
            .edges
            .iter()
            .any(|e| e.from == from && e.to == to && e.label == label)
        {
            return;
        }
        self.edges.push(Edge { from, to, label });
    }

    pub fn vertex(&self, uid: Uuid) -> Option<&ResourceRecord> {
        self.vertices.get(uid)
    }

    pub fn vertex_mut(&mut self, uid: Uuid) -> Option<&mut ResourceRecord> {
        self.vertices.get_mut(&uid)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.vertices.values()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges in `(kind, name)` sorted order for reproducible enumeration
    /// (spec §5 ordering guarantee).
    pub fn sorted_edges(&self) -> Vec<(&Edge, &ResourceRecord, &ResourceRecord)> {
        let mut out: Vec<_> = self
            .edges
            .iter()
            .filter_map(|e| Some((e, self.vertices.get(&e.from)?, self.vertices.get(&e.to)?)))
            .collect();
        out.sort_by(|a, b| {
            (a.2.kind.as_str(), a.2.name.as_str()).cmp(&(b.2.kind.as_str(), b.2.name.as_str()))
        });
        out
    }

    fn outgoing(&self, uid: Uuid) -> Vec<(Uuid, EdgeLabel)> {
        let mut v: Vec<_> = self
            .edges
            .iter()
            .filter(|e| e.from == uid)
            .map(|e| (e.to, e.label))
            .collect();
        v.sort_by_key(|(to, _)| {
            self.vertices
                .get(to)
                .map(|r| (r.kind.as_str().to_string(), r.name.clone()))
                .unwrap_or_default()
        });
        v
    }

    fn incoming(&self, uid: Uuid) -> Vec<(Uuid, EdgeLabel)> {
        let mut v: Vec<_> = self
            .edges
            .iter()
            .filter(|e| e.to == uid)
            .map(|e| (e.from, e.label))
            .collect();
        v.sort_by_key(|(from, _)| {
            self.vertices
                .get(from)
                .map(|r| (r.kind.as_str().to_string(), r.name.clone()))
                .unwrap_or_default()
        });
        v
    }

    /// BFS from `subject`, following outgoing (`downstream=true`) or incoming
    /// (`downstream=false`) edges. Terminates on every graph and visits each
    /// node at most once (spec invariant 4).
    pub fn bfs(&self, subject: Uuid, downstream: bool) -> Vec<BfsEdge> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut out = Vec::new();
        visited.insert(subject);
        queue.push_back(subject);

        while let Some(current) = queue.pop_front() {
            let neighbors = if downstream {
                self.outgoing(current)
            } else {
                self.incoming(current)
            };
            for (next, label) in neighbors {
                let is_back_reference = visited.contains(&next);
                out.push(BfsEdge {
                    from: current,
                    to: next,
                    label,
                    is_back_reference,
                });
                if !is_back_reference {
                    visited.insert(next);
                    queue.push_back(next);
                }
            }
        }
        out
    }

    /// Are `owns` edges acyclic? (spec invariant: "Graph is acyclic when
    /// restricted to `owns` edges").
    pub fn owns_subgraph_is_acyclic(&self) -> bool {
        let owns: Vec<&Edge> = self.edges.iter().filter(|e| e.label == EdgeLabel::Owns).collect();
        let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for e in &owns {
            adjacency.entry(e.from).or_default().push(e.to);
        }
        let mut state: HashMap<Uuid, u8> = HashMap::new(); // 0=unvisited,1=in-stack,2=done
        for &start in self.vertices.keys() {
            if state.get(&start).copied().unwrap_or(0) != 0 {
                continue;
            }
            if Self::has_cycle_from(start, &adjacency, &mut state) {
                return false;
            }
        }
        true
    }

    fn has_cycle_from(node: Uuid, adj: &HashMap<Uuid, Vec<Uuid>>, state: &mut HashMap<Uuid, u8>) -> bool {
        state.insert(node, 1);
        if let Some(children) = adj.get(&node) {
            for &child in children {
                match state.get(&child).copied().unwrap_or(0) {
                    0 => {
                        if Self::has_cycle_from(child, adj, state) {
                            return true;
                        }
                    }
                    1 => return true,
                    _ => {}
                }
            }
        }
        state.insert(node, 2);
        false
    }
}

#[derive(Debug, Clone)]
pub struct BfsEdge {
    pub from: Uuid,
    pub to: Uuid,
    pub label: EdgeLabel,
    pub is_back_reference: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    fn rec(kind: ResourceKind, name: &str) -> ResourceRecord {
        ResourceRecord::new(kind, "ns", name)
    }

    #[test]
    fn bfs_terminates_on_cycles() {
        let mut g = Graph::new();
        let a = g.add_vertex(rec(ResourceKind::Service, "a"));
        let b = g.add_vertex(rec(ResourceKind::Pod, "b"));
        g.add_edge(a, b, EdgeLabel::Selects);
        g.add_edge(b, a, EdgeLabel::References);

        let result = g.bfs(a, true);
        // each node visited at most once per direction: two edges total, one is a back-reference
        assert_eq!(result.len(), 2);
        assert!(result.iter().any(|e| e.is_back_reference));
    }

    #[test]
    fn owns_cycle_detected() {
        let mut g = Graph::new();
        let a = g.add_vertex(rec(ResourceKind::Deployment, "a"));
        let b = g.add_vertex(rec(ResourceKind::ReplicaSet, "b"));
        g.add_edge(a, b, EdgeLabel::Owns);
        assert!(g.owns_subgraph_is_acyclic());
        g.add_edge(b, a, EdgeLabel::Owns);
        assert!(!g.owns_subgraph_is_acyclic());
    }

    #[test]
    fn zero_selects_edges_for_orphan_service() {
        // scenario C: service selector matches nothing
        let mut g = Graph::new();
        let svc = g.add_vertex(rec(ResourceKind::Service, "orphan-service"));
        g.add_vertex(rec(ResourceKind::Pod, "lonely-pod"));
        let edges = g.bfs(svc, true);
        assert_eq!(edges.len(), 0);
    }
}
