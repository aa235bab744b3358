//! Parses `kubectl top` plain text and the kubelet Prometheus text exposition
//! format (node-proxy `/metrics`), per spec §4.3.

use std::collections::HashMap;

use crate::cluster::{NodeTopRow, PodTopRow};
use super::quantity::{parse_cpu_millicores, parse_memory_bytes};

/// Parses `kubectl top pod` plain-text table output into
/// `{namespace,name} -> {cpu_millicores, memory_bytes}`. Columns:
/// `NAMESPACE NAME CPU(cores) MEMORY(bytes)`.
pub fn parse_top_pods_text(text: &str) -> Vec<PodTopRow> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            Some(PodTopRow {
                namespace: cols[0].to_string(),
                name: cols[1].to_string(),
                cpu_millicores: parse_cpu_millicores(cols[2])?,
                memory_bytes: parse_memory_bytes(cols[3])?,
            })
        })
        .collect()
}

/// Parses `kubectl top node` plain-text table output. Columns:
/// `NAME CPU(cores) CPU% MEMORY(bytes) MEMORY%`.
pub fn parse_top_nodes_text(text: &str) -> Vec<NodeTopRow> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            Some(NodeTopRow {
                name: cols[0].to_string(),
                cpu_millicores: parse_cpu_millicores(cols[1])?,
                memory_bytes: parse_memory_bytes(cols[3])?,
            })
        })
        .collect()
}

/// One `(namespace, persistentvolumeclaim) -> (used_bytes, capacity_bytes)`
/// entry parsed from kubelet's volume-stats Prometheus metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeStats {
    pub used_bytes: Option<f64>,
    pub capacity_bytes: Option<f64>,
}

/// Parses a Prometheus text exposition document for
/// `kubelet_volume_stats_used_bytes` / `kubelet_volume_stats_capacity_bytes`,
/// keyed by the `namespace`/`persistentvolumeclaim` labels on each sample.
pub fn parse_kubelet_volume_stats(text: &str) -> HashMap<(String, String), VolumeStats> {
    let mut out: HashMap<(String, String), VolumeStats> = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let is_used = line.starts_with("kubelet_volume_stats_used_bytes{");
        let is_capacity = line.starts_with("kubelet_volume_stats_capacity_bytes{");
        if !is_used && !is_capacity {
            continue;
        }
        let Some((labels, value)) = split_metric_line(line) else { continue };
        let Some(namespace) = labels.get("namespace").cloned() else { continue };
        let Some(pvc) = labels.get("persistentvolumeclaim").cloned() else { continue };
        let entry = out.entry((namespace, pvc)).or_default();
        if is_used {
            entry.used_bytes = Some(value);
        } else {
            entry.capacity_bytes = Some(value);
        }
    }
    out
}

fn split_metric_line(line: &str) -> Option<(HashMap<String, String>, f64)> {
    let open = line.find('{')?;
    let close = line.rfind('}')?;
    if close <= open {
        return None;
    }
    let label_str = &line[open + 1..close];
    let value_str = line[close + 1..].trim();
    let value: f64 = value_str.parse().ok()?;
    let mut labels = HashMap::new();
    for pair in label_str.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        if let Some((k, v)) = pair.split_once('=') {
            labels.insert(k.trim().to_string(), v.trim().trim_matches('"').to_string());
        }
    }
    Some((labels, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_top_pods_table() {
        let text = "NAMESPACE     NAME        CPU(cores)   MEMORY(bytes)\nproduction    app-xyz     150m         256Mi\n";
        let rows = parse_top_pods_text(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cpu_millicores, 150);
        assert_eq!(rows[0].memory_bytes, 256 * 1024 * 1024);
    }

    #[test]
    fn parses_kubelet_volume_stats_scenario_e() {
        let text = r#"
# HELP kubelet_volume_stats_used_bytes Number of used bytes in the volume
kubelet_volume_stats_used_bytes{namespace="production",persistentvolumeclaim="fillpvc"} 996147200
kubelet_volume_stats_capacity_bytes{namespace="production",persistentvolumeclaim="fillpvc"} 1073741824
"#;
        let stats = parse_kubelet_volume_stats(text);
        let entry = stats.get(&("production".to_string(), "fillpvc".to_string())).unwrap();
        let pct = entry.used_bytes.unwrap() / entry.capacity_bytes.unwrap() * 100.0;
        assert!(pct >= 90.0, "pct={pct}");
    }
}
