//! Core data model: §3 of the spec. Records are owned by the orchestrator for
//! the lifetime of a run; graph vertices and issues hold `Uuid` references.

mod kind;
mod record;
mod issue;
mod graph;

pub use kind::ResourceKind;
pub use record::{Condition, EventKind, EventRecord, ResourceRecord};
pub use issue::{Issue, IssueSource, Severity};
pub use graph::{BfsEdge, EdgeLabel, Graph};

use uuid::Uuid;

/// Identity for a resource within a single run: `(kind, namespace, name)`.
/// `uid` is assigned per-process and is NOT the cluster's `metadata.uid` —
/// it exists only to key graph vertices and issue pointers for this run
/// (spec invariant: "`ResourceRecord.uid` is stable for a run; a second run
/// may assign different uids").
pub type Uid = Uuid;
