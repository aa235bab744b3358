use std::time::Duration;
use tokio::time::Instant;

/// A cancellable deadline threaded through every `ClusterClient` call (spec
/// §5: "every call is associated with a cancellable deadline"). Wraps
/// `tokio::time::timeout` rather than propagating cancellation via
/// exceptions-for-control-flow.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    deadline: Instant,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self {
            deadline: Instant::now() + duration,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Races `fut` against this deadline, mapping an elapsed timer to
    /// `ClusterError::Timeout`.
    pub async fn race<F, T>(&self, op: &str, fut: F) -> crate::cluster::ClusterResult<T>
    where
        F: std::future::Future<Output = crate::cluster::ClusterResult<T>>,
    {
        match tokio::time::timeout(self.remaining(), fut).await {
            Ok(result) => result,
            Err(_) => Err(crate::errors::ClusterError::Timeout(op.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn race_times_out() {
        let d = Deadline::after(Duration::from_millis(10));
        let result: crate::cluster::ClusterResult<()> = d
            .race("slow-op", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(crate::errors::ClusterError::Timeout(_))));
    }

    #[tokio::test]
    async fn race_completes_before_deadline() {
        let d = Deadline::after(Duration::from_secs(5));
        let result: crate::cluster::ClusterResult<i32> = d.race("fast-op", async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
