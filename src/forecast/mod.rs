//! Forecaster: capacity and certificate-expiry analysis over a run, backed
//! by the on-disk sample cache for cross-run trend projection (spec §4.6).

mod cache;
mod trend;

pub use cache::SampleCache;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cluster::{NodeTopRow, PodTopRow};
use crate::model::{ResourceRecord, Severity};
use crate::parsers::certs::{days_until_expiry, parse_tls_crt};
use crate::parsers::metrics_text::VolumeStats;

#[derive(Debug, Clone)]
pub struct CapacityWarning {
    pub resource: String,
    pub current_pct: f64,
    pub projected_pct: Option<f64>,
    pub hours_to_threshold: Option<f64>,
    pub recommended_action: String,
    pub severity: Severity,
}

#[derive(Debug, Clone)]
pub struct CertificateWarning {
    pub secret: String,
    pub expires: DateTime<Utc>,
    pub days_left: i64,
    pub referenced_by: Vec<String>,
    pub action: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default)]
pub struct ForecastResult {
    pub horizon_hours: u32,
    pub capacity_warnings: Vec<CapacityWarning>,
    pub certificate_warnings: Vec<CertificateWarning>,
    pub notes: Vec<String>,
}

const WARNING_THRESHOLD_PCT: f64 = 90.0;

pub struct Forecaster {
    cache: SampleCache,
}

impl Forecaster {
    pub fn new(cache_dir: &std::path::Path, cluster_context: &str) -> Self {
        Self {
            cache: SampleCache::new(cache_dir, cluster_context),
        }
    }

    pub fn analyze(
        &self,
        horizon_hours: u32,
        pods: &[PodTopRow],
        nodes_top: &[NodeTopRow],
        node_records: &[ResourceRecord],
        pvc_records: &[ResourceRecord],
        volume_stats: &HashMap<(String, String), VolumeStats>,
        secrets: &[ResourceRecord],
        ingresses: &[ResourceRecord],
        metrics_available: bool,
        now: DateTime<Utc>,
    ) -> ForecastResult {
        let mut result = ForecastResult { horizon_hours, ..Default::default() };

        if !metrics_available {
            result.notes.push("limited signals: metrics-server unavailable, capacity analysis skipped".to_string());
        } else {
            self.analyze_node_pressure(node_records, &mut result);
            self.analyze_pvc_capacity(pvc_records, volume_stats, horizon_hours, now, &mut result);
            self.analyze_node_capacity(nodes_top, node_records, horizon_hours, now, &mut result);
            let _ = pods; // pod-level capacity is rolled up via node capacity; pods retained for future per-pod breakdowns
        }

        self.analyze_certificates(secrets, ingresses, now, &mut result);

        result
    }

    fn analyze_node_pressure(&self, nodes: &[ResourceRecord], result: &mut ForecastResult) {
        for node in nodes {
            for pressure in ["DiskPressure", "MemoryPressure", "PIDPressure"] {
                if let Some(cond) = node.condition(pressure) {
                    if cond.status == "True" {
                        result.capacity_warnings.push(CapacityWarning {
                            resource: format!("Node/{}", node.name),
                            current_pct: 100.0,
                            projected_pct: None,
                            hours_to_threshold: Some(0.0),
                            recommended_action: format!("investigate {pressure} on node {}", node.name),
                            severity: Severity::Critical,
                        });
                    }
                }
            }
        }
    }

    fn analyze_pvc_capacity(
        &self,
        pvcs: &[ResourceRecord],
        volume_stats: &HashMap<(String, String), VolumeStats>,
        horizon_hours: u32,
        now: DateTime<Utc>,
        result: &mut ForecastResult,
    ) {
        for pvc in pvcs {
            let Some(stats) = volume_stats.get(&(pvc.namespace.clone(), pvc.name.clone())) else { continue };
            let (Some(used), Some(capacity)) = (stats.used_bytes, stats.capacity_bytes) else { continue };
            if capacity <= 0.0 {
                continue;
            }
            let current_pct = used / capacity * 100.0;
            let metric_key = format!("pvc/{}/{}", pvc.namespace, pvc.name);
            let _ = self.cache.append_sample(&metric_key, now.timestamp(), current_pct);
            let samples = self.cache.read_samples(&metric_key);
            let projection = trend::project(&samples, horizon_hours as f64 * 3600.0);
            let projected_pct = projection.map(|p| p.projected);

            if current_pct >= WARNING_THRESHOLD_PCT || projected_pct.map(|p| p >= WARNING_THRESHOLD_PCT).unwrap_or(false) {
                let severity = if current_pct >= WARNING_THRESHOLD_PCT { Severity::Critical } else { Severity::Warning };
                result.capacity_warnings.push(CapacityWarning {
                    resource: format!("PersistentVolumeClaim/{}/{}", pvc.namespace, pvc.name),
                    current_pct,
                    projected_pct,
                    hours_to_threshold: hours_to_threshold(current_pct, projected_pct, horizon_hours),
                    recommended_action: format!("expand or prune PVC {} in {}", pvc.name, pvc.namespace),
                    severity,
                });
            } else if samples.len() < 2 {
                result.notes.push(format!("insufficient data for capacity trend on PVC {}/{}", pvc.namespace, pvc.name));
            }
        }
    }

    fn analyze_node_capacity(
        &self,
        nodes_top: &[NodeTopRow],
        node_records: &[ResourceRecord],
        horizon_hours: u32,
        now: DateTime<Utc>,
        result: &mut ForecastResult,
    ) {
        for row in nodes_top {
            let Some(capacity_bytes) = node_records
                .iter()
                .find(|n| n.name == row.name)
                .and_then(|n| n.property("capacity"))
                .and_then(|c| c.get("memory"))
                .and_then(|v| v.as_str())
                .and_then(crate::parsers::quantity::parse_memory_bytes)
            else {
                continue;
            };
            if capacity_bytes <= 0 {
                continue;
            }
            let metric_key = format!("node/{}/memory", row.name);
            let current_pct = row.memory_bytes as f64 / capacity_bytes as f64 * 100.0;
            let _ = self.cache.append_sample(&metric_key, now.timestamp(), current_pct);
            let samples = self.cache.read_samples(&metric_key);
            let projection = trend::project(&samples, horizon_hours as f64 * 3600.0);
            let projected_pct = projection.map(|p| p.projected);

            if current_pct >= WARNING_THRESHOLD_PCT || projected_pct.map(|p| p >= WARNING_THRESHOLD_PCT).unwrap_or(false) {
                let severity = if current_pct >= WARNING_THRESHOLD_PCT { Severity::Critical } else { Severity::Warning };
                result.capacity_warnings.push(CapacityWarning {
                    resource: format!("Node/{}", row.name),
                    current_pct,
                    projected_pct,
                    hours_to_threshold: hours_to_threshold(current_pct, projected_pct, horizon_hours),
                    recommended_action: format!("add capacity or rebalance workloads off node {}", row.name),
                    severity,
                });
            }
        }
    }

    fn analyze_certificates(&self, secrets: &[ResourceRecord], ingresses: &[ResourceRecord], now: DateTime<Utc>, result: &mut ForecastResult) {
        for secret in secrets {
            if secret.property("secretType").and_then(|v| v.as_str()) != Some("kubernetes.io/tls") {
                continue;
            }
            let Some(tls_crt) = secret.property("data").and_then(|d| d.get("tls.crt")).and_then(|v| v.as_str()) else { continue };
            let Some(parsed) = parse_tls_crt(tls_crt) else {
                result.notes.push(format!("failed to parse tls.crt for Secret {}/{}", secret.namespace, secret.name));
                continue;
            };
            let days_left = days_until_expiry(parsed.not_after, now);
            if days_left > 14 {
                continue;
            }
            let referenced_by = ingresses
                .iter()
                .filter(|ing| ing.namespace == secret.namespace)
                .filter(|ing| {
                    ing.property("ingressTls")
                        .and_then(|tls| tls.as_array())
                        .map(|rules| rules.iter().any(|r| r.get("secretName").and_then(|v| v.as_str()) == Some(secret.name.as_str())))
                        .unwrap_or(false)
                })
                .map(|ing| ing.full_name())
                .collect();

            let severity = if days_left <= 3 { Severity::Critical } else { Severity::Warning };
            result.certificate_warnings.push(CertificateWarning {
                secret: secret.full_name(),
                expires: parsed.not_after,
                days_left,
                referenced_by,
                action: format!("rotate the TLS certificate for Secret {}/{}", secret.namespace, secret.name),
                severity,
            });
        }
    }
}

fn hours_to_threshold(current_pct: f64, projected_pct: Option<f64>, horizon_hours: u32) -> Option<f64> {
    if current_pct >= WARNING_THRESHOLD_PCT {
        return Some(0.0);
    }
    let projected_pct = projected_pct?;
    if projected_pct <= current_pct {
        return None;
    }
    let rate_per_hour = (projected_pct - current_pct) / horizon_hours as f64;
    if rate_per_hour <= 0.0 {
        return None;
    }
    Some(((WARNING_THRESHOLD_PCT - current_pct) / rate_per_hour).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    fn pvc(ns: &str, name: &str) -> ResourceRecord {
        ResourceRecord::new(ResourceKind::PersistentVolumeClaim, ns, name)
    }

    #[test]
    fn scenario_e_pvc_near_full_is_critical() {
        let dir = tempfile::tempdir().unwrap();
        let forecaster = Forecaster::new(dir.path(), "test-ctx");
        let mut stats = HashMap::new();
        stats.insert(("production".to_string(), "fillpvc".to_string()), VolumeStats { used_bytes: Some(996147200.0), capacity_bytes: Some(1073741824.0) });

        let mut result = ForecastResult::default();
        forecaster.analyze_pvc_capacity(&[pvc("production", "fillpvc")], &stats, 48, Utc::now(), &mut result);
        let w = &result.capacity_warnings[0];
        assert!(w.current_pct >= 90.0);
        assert_eq!(w.severity, Severity::Critical);
    }

    #[test]
    fn scenario_d_cert_thresholds() {
        use chrono::Duration;
        // parse_tls_crt itself is covered by parsers::certs's own tests; this
        // exercises the days-left -> severity classification used here.
        let now = Utc::now();
        let expires_in_8_days = now + Duration::days(8);
        let days_left = days_until_expiry(expires_in_8_days, now);
        let severity = if days_left <= 3 { Severity::Critical } else { Severity::Warning };
        assert_eq!(severity, Severity::Warning);

        let expires_in_2_days = now + Duration::days(2);
        let days_left = days_until_expiry(expires_in_2_days, now);
        let severity = if days_left <= 3 { Severity::Critical } else { Severity::Warning };
        assert_eq!(severity, Severity::Critical);
    }

    #[test]
    fn node_pressure_is_immediate_critical() {
        let dir = tempfile::tempdir().unwrap();
        let forecaster = Forecaster::new(dir.path(), "ctx");
        let mut node = ResourceRecord::new(ResourceKind::Node, "", "node-1");
        node.conditions.push(crate::model::Condition {
            type_: "DiskPressure".into(),
            status: "True".into(),
            reason: None,
            message: None,
        });
        let mut result = ForecastResult::default();
        forecaster.analyze_node_pressure(&[node], &mut result);
        assert_eq!(result.capacity_warnings[0].severity, Severity::Critical);
    }

    #[test]
    fn metrics_unavailable_emits_limited_signals_note() {
        let dir = tempfile::tempdir().unwrap();
        let forecaster = Forecaster::new(dir.path(), "ctx");
        let result = forecaster.analyze(48, &[], &[], &[], &[], &HashMap::new(), &[], &[], false, Utc::now());
        assert!(result.notes.iter().any(|n| n.contains("limited signals")));
        assert!(result.capacity_warnings.is_empty());
    }
}
