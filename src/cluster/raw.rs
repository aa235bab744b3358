use serde_json::Value;

/// A single raw object returned by the cluster API, pre-parse. Carries the
/// JSON value plus the source kind so parsers don't need to re-derive it.
#[derive(Debug, Clone)]
pub struct RawArtifact {
    pub kind: String,
    pub json: Value,
}

/// One row of `kubectl top pod` output.
#[derive(Debug, Clone)]
pub struct PodTopRow {
    pub namespace: String,
    pub name: String,
    pub cpu_millicores: i64,
    pub memory_bytes: i64,
}

/// One row of `kubectl top node` output.
#[derive(Debug, Clone)]
pub struct NodeTopRow {
    pub name: String,
    pub cpu_millicores: i64,
    pub memory_bytes: i64,
}
