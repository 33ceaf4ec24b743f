//! Bounded retry with fixed backoff.
//!
//! Three operation classes carry their own policy: field assignments
//! (transient UI failures), login (session establishment) and pre-flight
//! work (network paths, input parsing). Screen-level retry is not a
//! policy — it is the single re-fill pass built into the fill engine.

use crate::errors::EngineError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Individual field assignments.
    pub const FIELD_SET: RetryPolicy = RetryPolicy {
        attempts: 3,
        backoff: Duration::from_secs(1),
    };

    /// Session login before a batch.
    pub const LOGIN: RetryPolicy = RetryPolicy {
        attempts: 3,
        backoff: Duration::from_secs(3),
    };

    /// Input parsing and other pre-flight work.
    pub const PREFLIGHT: RetryPolicy = RetryPolicy {
        attempts: 3,
        backoff: Duration::from_secs(1),
    };

    /// Network-drive path resolution, the slowest dependency to recover.
    pub const PATH_RESOLVE: RetryPolicy = RetryPolicy {
        attempts: 3,
        backoff: Duration::from_secs(5),
    };

    /// Runs `op` until it succeeds or attempts are exhausted, sleeping
    /// the fixed backoff between attempts. Re-raises the last error.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let mut last = None;
        for attempt in 1..=self.attempts.max(1) {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt < self.attempts {
                        warn!(attempt, error = %e, "operation failed; backing off before retry");
                        tokio::time::sleep(self.backoff).await;
                    }
                    last = Some(e);
                }
            }
        }
        Err(last.unwrap_or_else(|| EngineError::Session("retry ran zero attempts".to_string())))
    }
}
