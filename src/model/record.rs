use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use super::kind::ResourceKind;

/// A typed, parsed view of a single cluster object plus the events attached
/// to it during collection. See spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub uid: Uuid,
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,

    pub phase: Option<String>,
    pub ready: Option<bool>,
    pub conditions: Vec<Condition>,

    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,

    /// Free-form bag: container statuses, owner references, selectors, spec
    /// fragments (volumes, resource requests/limits), metrics snapshot. Kept
    /// as `serde_json::Value` so parsers stay decoupled from every
    /// downstream consumer's exact field needs.
    pub properties: HashMap<String, Value>,

    pub events: Vec<EventRecord>,
}

impl ResourceRecord {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: Uuid::new_v4(),
            kind,
            namespace: namespace.into(),
            name: name.into(),
            phase: None,
            ready: None,
            conditions: Vec::new(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
            properties: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// `"Kind/namespace/name"`, the identity spec §3 requires for display
    /// and for the `(reason, resource.full_name)` equality used by
    /// idempotence tests and `--watch` diffing.
    pub fn full_name(&self) -> String {
        format!("{}/{}/{}", self.kind, self.namespace, self.name)
    }

    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub type_: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Normal,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub type_: EventKind,
    pub reason: String,
    pub message: String,
    pub count: i32,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub involved_object: String,
}

impl EventRecord {
    /// Age of the last occurrence relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.last_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_format() {
        let r = ResourceRecord::new(ResourceKind::Pod, "production", "failing-app-xyz");
        assert_eq!(r.full_name(), "Pod/production/failing-app-xyz");
    }
}
