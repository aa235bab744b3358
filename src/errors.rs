//! Error taxonomy for the core pipeline.
//!
//! `ClusterError` is the boundary error returned by `ClusterClient`. `CoreError`
//! is the orchestrator-level taxonomy used to pick an exit code; everything
//! except `InputError`, subject `NotFound`, and `Fatal` is downgraded to a
//! partial error and surfaces in `notes[]` instead of aborting the run.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ClusterError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("cluster unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Other(String),
}

impl ClusterError {
    pub fn from_kube(op: &str, err: &kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 404 => {
                ClusterError::NotFound(format!("{op}: {}", resp.message))
            }
            kube::Error::Api(resp) if resp.code == 403 => {
                ClusterError::Forbidden(format!("{op}: {}", resp.message))
            }
            kube::Error::Api(resp) if resp.code == 504 || resp.code == 408 => {
                ClusterError::Timeout(format!("{op}: {}", resp.message))
            }
            kube::Error::Api(resp) => ClusterError::Other(format!("{op}: {}", resp.message)),
            other => ClusterError::Unavailable(format!("{op}: {other}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InputError(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    Forbidden(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("failed to parse artifact: {0}")]
    ParseError(String),
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl From<ClusterError> for CoreError {
    fn from(e: ClusterError) -> Self {
        match e {
            ClusterError::NotFound(m) => CoreError::NotFound(m),
            ClusterError::Forbidden(m) => CoreError::Forbidden(m),
            ClusterError::Timeout(m) => CoreError::Timeout(m),
            ClusterError::Unavailable(m) => CoreError::Unavailable(m),
            ClusterError::Other(m) => CoreError::Fatal(m),
        }
    }
}

impl CoreError {
    /// Exit code this error maps to when it aborts the pipeline (InputError/NotFound/Fatal only).
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::InputError(_) | CoreError::NotFound(_) | CoreError::Fatal(_) => 2,
            _ => 2,
        }
    }

    /// A short remediation hint shown alongside the single-line cause (§7).
    pub fn remediation_hint(&self) -> Option<&'static str> {
        match self {
            CoreError::Forbidden(_) => {
                Some("run `kubectl auth can-i <verb> <resource> -n <namespace>` to check RBAC")
            }
            CoreError::Unavailable(_) => Some("check cluster connectivity and current-context"),
            CoreError::Timeout(_) => Some("re-run with a larger --run-timeout if the cluster is slow"),
            _ => None,
        }
    }
}
