//! Weights table: `reason -> base score`. Loaded from a user-supplied YAML
//! file when `scoring.weights_file` is set, falling back to the spec's
//! illustrative defaults otherwise. Duplicate keys on load are a fatal
//! configuration error (spec §4.5).

use std::collections::HashMap;
use std::path::Path;

use crate::errors::CoreError;

#[derive(Debug, Clone)]
pub struct WeightsTable {
    scores: HashMap<String, u8>,
}

impl WeightsTable {
    pub fn default_table() -> Self {
        let mut scores = HashMap::new();
        for (reason, score) in DEFAULT_WEIGHTS {
            scores.insert((*reason).to_string(), *score);
        }
        Self { scores }
    }

    /// Loads a flat `reason: score` YAML mapping, rejecting duplicate keys.
    /// Parsed by hand rather than via `serde_yaml::Mapping` because the
    /// underlying YAML parser silently collapses duplicate keys before a
    /// `HashMap`-typed deserialize ever sees them.
    pub fn load_yaml(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::InputError(format!("reading weights file {}: {e}", path.display())))?;

        let mut scores = HashMap::new();
        let mut seen = std::collections::HashSet::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else { continue };
            let key = key.trim().trim_matches('"').to_string();
            let value = value.trim();
            let score: u8 = value
                .parse()
                .map_err(|_| CoreError::InputError(format!("weights file: non-integer score for {key:?}: {value:?}")))?;
            if score > 100 {
                return Err(CoreError::InputError(format!("weights file: score out of range [0,100] for {key:?}: {score}")));
            }
            if !seen.insert(key.clone()) {
                return Err(CoreError::InputError(format!("weights file: duplicate key {key:?}")));
            }
            scores.insert(key, score);
        }
        Ok(Self { scores })
    }

    pub fn lookup(&self, reason: &str) -> Option<u8> {
        self.scores.get(reason).copied()
    }
}

const DEFAULT_WEIGHTS: &[(&str, u8)] = &[
    ("CrashLoopBackOff", 90),
    ("ImagePullBackOff", 85),
    ("ErrImagePull", 85),
    ("OOMKilled", 90),
    ("FailedScheduling", 80),
    ("FailedMount", 75),
    ("Unhealthy", 60),
    ("BackOff", 55),
    ("Evicted", 85),
    ("NodeNotReady", 85),
    ("NetworkNotReady", 85),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_spec_illustrative_values() {
        let t = WeightsTable::default_table();
        assert_eq!(t.lookup("CrashLoopBackOff"), Some(90));
        assert_eq!(t.lookup("FailedScheduling"), Some(80));
        assert_eq!(t.lookup("Unknown"), None);
    }

    #[test]
    fn duplicate_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.yaml");
        std::fs::write(&path, "CrashLoopBackOff: 90\nCrashLoopBackOff: 50\n").unwrap();
        let result = WeightsTable::load_yaml(&path);
        assert!(result.is_err());
    }

    #[test]
    fn loads_custom_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.yaml");
        std::fs::write(&path, "CrashLoopBackOff: 99\nFooReason: 20\n").unwrap();
        let t = WeightsTable::load_yaml(&path).unwrap();
        assert_eq!(t.lookup("CrashLoopBackOff"), Some(99));
        assert_eq!(t.lookup("FooReason"), Some(20));
    }
}
