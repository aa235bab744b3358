use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity bucket derived from `score` (spec §3): `<50` Info, `[50,90)`
/// Warning, `>=90` Critical. `Ord` is derived so the highest-scoring issue
/// can be selected with a plain `max_by_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn from_score(score: u8) -> Self {
        if score >= 90 {
            Severity::Critical
        } else if score >= 50 {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    Event,
    Status,
    Log,
    Forecast,
    Node,
}

/// One diagnostic finding produced by the scoring engine or the forecaster.
/// See spec §3; root-cause/contributing-factor selection lives in
/// `scoring::select_root_cause`, not on this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub title: String,
    pub reason: String,
    pub score: u8,
    /// How many times this reason has recurred (event `count`, or container
    /// restart count); used as a root-cause tie-break key.
    pub recurrence: i32,
    pub source: IssueSource,
    /// The subject's uid this issue was raised against (may be a child of
    /// the command's subject, e.g. a pod under a Deployment).
    pub resource: Uuid,
    pub resource_full_name: String,
    pub evidence: Vec<String>,
    pub suggested_actions: Vec<String>,
}

impl Issue {
    pub fn severity(&self) -> Severity {
        Severity::from_score(self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_buckets_match_spec_boundaries() {
        assert_eq!(Severity::from_score(0), Severity::Info);
        assert_eq!(Severity::from_score(49), Severity::Info);
        assert_eq!(Severity::from_score(50), Severity::Warning);
        assert_eq!(Severity::from_score(89), Severity::Warning);
        assert_eq!(Severity::from_score(90), Severity::Critical);
        assert_eq!(Severity::from_score(100), Severity::Critical);
    }

    #[test]
    fn severity_orders_by_criticality() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
