//! ASCII tree rendering for `kubectl-smart graph`: each vertex line carries a
//! health glyph, children are indented with box-drawing connectors, and the
//! tree is truncated past a configurable fan-out cap.

use colored::Colorize;

use crate::model::{Graph, Severity};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub downstream: bool,
    pub max_children: usize,
    pub colors_enabled: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            downstream: true,
            max_children: 50,
            colors_enabled: true,
        }
    }
}

/// Renders the BFS tree rooted at `subject` as indented ASCII, one line per
/// edge traversed, truncating any vertex's children past `max_children` with
/// a `(+N more)` marker.
pub fn render_tree(graph: &Graph, subject: Uuid, severities: &[(Uuid, Severity)], opts: &TreeOptions) -> String {
    let edges = graph.bfs(subject, opts.downstream);
    let mut children: std::collections::HashMap<Uuid, Vec<&crate::model::BfsEdge>> = std::collections::HashMap::new();
    for e in &edges {
        if !e.is_back_reference {
            children.entry(e.from).or_default().push(e);
        }
    }

    let mut out = String::new();
    if let Some(root) = graph.vertex(subject) {
        out.push_str(&format!("{} {}\n", glyph(subject, severities, opts.colors_enabled), root.full_name()));
    }
    render_children(graph, subject, &children, "", opts, &mut out, severities);
    out
}

fn render_children(
    graph: &Graph,
    node: Uuid,
    children: &std::collections::HashMap<Uuid, Vec<&crate::model::BfsEdge>>,
    prefix: &str,
    opts: &TreeOptions,
    out: &mut String,
    severities: &[(Uuid, Severity)],
) {
    let Some(kids) = children.get(&node) else { return };
    let total = kids.len();
    let shown = kids.iter().take(opts.max_children);
    let shown_count = shown.len().min(opts.max_children);

    for (i, edge) in kids.iter().take(opts.max_children).enumerate() {
        let is_last = i + 1 == shown_count && total <= opts.max_children;
        let connector = if is_last { "└── " } else { "├── " };
        let Some(target) = graph.vertex(edge.to) else { continue };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(&format!(
            "{} [{}] {}\n",
            glyph(edge.to, severities, opts.colors_enabled),
            edge.label.as_str(),
            target.full_name()
        ));
        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        render_children(graph, edge.to, children, &child_prefix, opts, out, severities);
    }

    if total > opts.max_children {
        out.push_str(prefix);
        out.push_str(&format!("└── (+{} more)\n", total - opts.max_children));
    }
}

fn glyph(uid: Uuid, severities: &[(Uuid, Severity)], colors_enabled: bool) -> String {
    let sev = severities.iter().find(|(u, _)| *u == uid).map(|(_, s)| *s);
    let (symbol, color) = match sev {
        Some(Severity::Critical) => ("✗", "red"),
        Some(Severity::Warning) => ("!", "yellow"),
        Some(Severity::Info) | None => ("✓", "green"),
    };
    if !colors_enabled {
        return symbol.to_string();
    }
    match color {
        "red" => symbol.red().to_string(),
        "yellow" => symbol.yellow().to_string(),
        _ => symbol.green().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeLabel, ResourceKind, ResourceRecord};

    #[test]
    fn truncates_past_cap() {
        let mut g = Graph::new();
        let svc = g.add_vertex(ResourceRecord::new(ResourceKind::Service, "ns", "svc"));
        for i in 0..5 {
            let pod = g.add_vertex(ResourceRecord::new(ResourceKind::Pod, "ns", &format!("pod-{i}")));
            g.add_edge(svc, pod, EdgeLabel::Selects);
        }
        let opts = TreeOptions { max_children: 2, colors_enabled: false, ..Default::default() };
        let tree = render_tree(&g, svc, &[], &opts);
        assert!(tree.contains("(+3 more)"));
    }

    #[test]
    fn renders_root_and_children() {
        let mut g = Graph::new();
        let svc = g.add_vertex(ResourceRecord::new(ResourceKind::Service, "ns", "svc"));
        let pod = g.add_vertex(ResourceRecord::new(ResourceKind::Pod, "ns", "pod-1"));
        g.add_edge(svc, pod, EdgeLabel::Selects);
        let opts = TreeOptions { colors_enabled: false, ..Default::default() };
        let tree = render_tree(&g, svc, &[], &opts);
        assert!(tree.contains("Service/ns/svc"));
        assert!(tree.contains("[selects] Pod/ns/pod-1"));
    }
}
