//! ClusterClient: the boundary to the cluster API (spec §4.1). Every
//! operation consumed by the core is declared on the `ClusterClient` trait
//! so collectors can run against either the real `kube`-backed
//! implementation or a `mockall` mock in tests.

mod kube_client;
mod deadline;
mod raw;

pub use deadline::Deadline;
pub use kube_client::KubeClusterClient;
pub use raw::{NodeTopRow, PodTopRow, RawArtifact};

use crate::errors::ClusterError;
use crate::model::ResourceKind;
use futures::future::BoxFuture;

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Filter passed to `Events`: match events whose `involvedObject` is the
/// subject itself or, for controllers, one of its children.
#[derive(Debug, Clone)]
pub struct InvolvedObjectFilter {
    pub kind: ResourceKind,
    pub namespace: String,
    pub names: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
pub trait ClusterClient: Send + Sync {
    fn list_namespaced<'a>(
        &'a self,
        kind: &'a ResourceKind,
        namespace: &'a str,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<Vec<RawArtifact>>>;

    fn get<'a>(
        &'a self,
        kind: &'a ResourceKind,
        namespace: &'a str,
        name: &'a str,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<RawArtifact>>;

    /// Verbose text status summary (name, phase, conditions), analogous to
    /// `kubectl describe`'s status section.
    fn describe<'a>(
        &'a self,
        kind: &'a ResourceKind,
        namespace: &'a str,
        name: &'a str,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<String>>;

    fn events<'a>(
        &'a self,
        namespace: &'a str,
        filter: &'a InvolvedObjectFilter,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<Vec<RawArtifact>>>;

    fn logs<'a>(
        &'a self,
        namespace: &'a str,
        pod: &'a str,
        container: &'a str,
        tail: i64,
        previous: bool,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<String>>;

    fn top_pods<'a>(
        &'a self,
        namespace: &'a str,
        deadline: Deadline,
    ) -> BoxFuture<'a, ClusterResult<Vec<PodTopRow>>>;

    fn top_nodes<'a>(&'a self, deadline: Deadline) -> BoxFuture<'a, ClusterResult<Vec<NodeTopRow>>>;

    fn raw_get<'a>(&'a self, path: &'a str, deadline: Deadline) -> BoxFuture<'a, ClusterResult<String>>;

    fn current_context(&self) -> Option<String>;

    fn can_i<'a>(
        &'a self,
        verb: &'a str,
        resource: &'a str,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, ClusterResult<bool>>;
}
