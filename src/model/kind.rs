use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed enumeration of known resource kinds, plus `Generic` for CRDs
/// (preserves the original `kind` string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    ReplicaSet,
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
    Service,
    Ingress,
    ConfigMap,
    Secret,
    PersistentVolumeClaim,
    PersistentVolume,
    Node,
    HorizontalPodAutoscaler,
    NetworkPolicy,
    Endpoints,
    ServiceAccount,
    Generic(String),
}

impl ResourceKind {
    /// The canonical `Kind` string used in `full_name` and CLI output.
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::Job => "Job",
            ResourceKind::CronJob => "CronJob",
            ResourceKind::Service => "Service",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::PersistentVolume => "PersistentVolume",
            ResourceKind::Node => "Node",
            ResourceKind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            ResourceKind::NetworkPolicy => "NetworkPolicy",
            ResourceKind::Endpoints => "Endpoints",
            ResourceKind::ServiceAccount => "ServiceAccount",
            ResourceKind::Generic(s) => s.as_str(),
        }
    }

    /// Whether this kind is a workload controller that owns Pods (used by
    /// the scorer's scope modifier: "subject is a controller with >=50%
    /// unhealthy replicas").
    pub fn is_controller(&self) -> bool {
        matches!(
            self,
            ResourceKind::ReplicaSet
                | ResourceKind::Deployment
                | ResourceKind::StatefulSet
                | ResourceKind::DaemonSet
                | ResourceKind::Job
        )
    }

    /// Normalizes a raw Kubernetes `kind` string (as it appears on the wire)
    /// into a `ResourceKind`, falling back to `Generic` for anything unknown.
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "Pod" => ResourceKind::Pod,
            "ReplicaSet" => ResourceKind::ReplicaSet,
            "Deployment" => ResourceKind::Deployment,
            "StatefulSet" => ResourceKind::StatefulSet,
            "DaemonSet" => ResourceKind::DaemonSet,
            "Job" => ResourceKind::Job,
            "CronJob" => ResourceKind::CronJob,
            "Service" => ResourceKind::Service,
            "Ingress" => ResourceKind::Ingress,
            "ConfigMap" => ResourceKind::ConfigMap,
            "Secret" => ResourceKind::Secret,
            "PersistentVolumeClaim" => ResourceKind::PersistentVolumeClaim,
            "PersistentVolume" => ResourceKind::PersistentVolume,
            "Node" => ResourceKind::Node,
            "HorizontalPodAutoscaler" => ResourceKind::HorizontalPodAutoscaler,
            "NetworkPolicy" => ResourceKind::NetworkPolicy,
            "Endpoints" | "EndpointSlice" => ResourceKind::Endpoints,
            "ServiceAccount" => ResourceKind::ServiceAccount,
            other => ResourceKind::Generic(other.to_string()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parses CLI-supplied kind tokens, including common kubectl abbreviations.
impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let kind = match lower.as_str() {
            "pod" | "pods" | "po" => ResourceKind::Pod,
            "replicaset" | "replicasets" | "rs" => ResourceKind::ReplicaSet,
            "deployment" | "deployments" | "deploy" => ResourceKind::Deployment,
            "statefulset" | "statefulsets" | "sts" => ResourceKind::StatefulSet,
            "daemonset" | "daemonsets" | "ds" => ResourceKind::DaemonSet,
            "job" | "jobs" => ResourceKind::Job,
            "cronjob" | "cronjobs" | "cj" => ResourceKind::CronJob,
            "service" | "services" | "svc" => ResourceKind::Service,
            "ingress" | "ingresses" | "ing" => ResourceKind::Ingress,
            "configmap" | "configmaps" | "cm" => ResourceKind::ConfigMap,
            "secret" | "secrets" => ResourceKind::Secret,
            "persistentvolumeclaim" | "persistentvolumeclaims" | "pvc" => {
                ResourceKind::PersistentVolumeClaim
            }
            "persistentvolume" | "persistentvolumes" | "pv" => ResourceKind::PersistentVolume,
            "node" | "nodes" | "no" => ResourceKind::Node,
            "horizontalpodautoscaler" | "horizontalpodautoscalers" | "hpa" => {
                ResourceKind::HorizontalPodAutoscaler
            }
            "networkpolicy" | "networkpolicies" | "netpol" => ResourceKind::NetworkPolicy,
            "endpoints" | "endpointslice" | "ep" => ResourceKind::Endpoints,
            "serviceaccount" | "serviceaccounts" | "sa" => ResourceKind::ServiceAccount,
            _ if !s.is_empty() => ResourceKind::Generic(s.to_string()),
            _ => return Err("empty resource kind".to_string()),
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_abbreviations() {
        assert_eq!("po".parse::<ResourceKind>().unwrap(), ResourceKind::Pod);
        assert_eq!("deploy".parse::<ResourceKind>().unwrap(), ResourceKind::Deployment);
        assert_eq!("hpa".parse::<ResourceKind>().unwrap(), ResourceKind::HorizontalPodAutoscaler);
    }

    #[test]
    fn unknown_kind_is_generic() {
        match "widget".parse::<ResourceKind>().unwrap() {
            ResourceKind::Generic(s) => assert_eq!(s, "widget"),
            other => panic!("expected Generic, got {other:?}"),
        }
    }

    #[test]
    fn from_wire_preserves_original_string() {
        match ResourceKind::from_wire("MyCustomResource") {
            ResourceKind::Generic(s) => assert_eq!(s, "MyCustomResource"),
            other => panic!("expected Generic, got {other:?}"),
        }
    }
}
