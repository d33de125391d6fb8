//! # Execution Wrapper
//!
//! Every remote call goes through [`Executor::run`], which classifies the
//! failure and retries transient ones with capped exponential backoff plus
//! jitter.

use crate::telemetry::RemoteCallTelemetry;
use config::RetryConfig;
use errors::{RemoteError, RemoteResult, WorkspaceError, WorkspaceResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ratio: f64
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter_ratio: config.jitter_ratio.clamp(0.0, 1.0)
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (0-based) without jitter:
    /// `min(max_delay, base_delay * 2^attempt)`.
    pub fn capped_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Delay with jitter. `sample` is a uniform draw from `[0, 1)`.
    pub fn backoff_delay(&self, attempt: u32, sample: f64) -> Duration {
        let capped = self.capped_delay(attempt);
        capped + capped.mul_f64(self.jitter_ratio * sample.clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Executor {
    policy: RetryPolicy,
    telemetry: RemoteCallTelemetry
}

impl Executor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            telemetry: RemoteCallTelemetry
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `call` until it succeeds, fails terminally or the attempt budget
    /// is spent.
    ///
    /// Terminal failures return at once as [`WorkspaceError::Remote`]. When the
    /// budget runs out on a transport failure the result is
    /// [`WorkspaceError::Network`]; any other exhausted failure is returned as
    /// [`WorkspaceError::Remote`] unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> WorkspaceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>
    {
        let max_attempts = self.policy.max_attempts;
        let mut attempt: u32 = 0;

        loop {
            self.telemetry.record_attempt(operation);
            debug!(operation, attempt, "Remote call");

            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err
            };

            if !err.is_retryable() {
                self.telemetry.record_failure(operation, "terminal");
                return Err(WorkspaceError::Remote(err));
            }

            attempt += 1;
            if attempt >= max_attempts {
                return Err(self.exhausted(operation, attempt, err));
            }

            let delay = err
                .retry_after()
                .unwrap_or_else(|| self.policy.backoff_delay(attempt - 1, rand::random::<f64>()));
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying remote call after transient failure"
            );
            self.telemetry.record_retry(operation);
            tokio::time::sleep(delay).await;
        }
    }

    fn exhausted(&self, operation: &'static str, attempts: u32, err: RemoteError) -> WorkspaceError {
        warn!(operation, attempts, error = %err, "Retry budget exhausted");
        if err.is_transport() {
            self.telemetry.record_failure(operation, "network");
            WorkspaceError::Network {
                operation: operation.to_string(),
                attempts,
                max_attempts: self.policy.max_attempts,
                reason: err.to_string()
            }
        } else {
            self.telemetry.record_failure(operation, "exhausted");
            WorkspaceError::Remote(err)
        }
    }
}
