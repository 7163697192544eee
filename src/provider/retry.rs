// src/provider/retry.rs — Retry with exponential backoff for model calls
//
// Wraps any ModelClient with bounded retry on transient failures.
// Retries: rate limits (429), server errors (5xx), timeouts, connection
// resets. Does NOT retry: bad requests, auth failures, malformed responses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ModelClient, Turn};
use crate::infra::errors::ScadCriticError;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_DELAY_MS: u64 = 2_000;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 30_000;
const JITTER_FRACTION: f64 = 0.2;

/// Explicit retry policy: total attempt cap and backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

/// A client wrapper that adds retry with exponential backoff.
///
/// Delegates to the inner client, retrying `generate()` and `converse()`
/// on transient errors until the attempt cap is reached.
pub struct RetryClient {
    inner: Arc<dyn ModelClient>,
    policy: RetryPolicy,
}

impl RetryClient {
    pub fn new(inner: Arc<dyn ModelClient>) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(inner: Arc<dyn ModelClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Calculate the delay before retry number `attempt` (0-indexed).
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        // If the server told us how long to wait, use that (with a small buffer).
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay + Duration::from_millis(100);
        }

        let base_ms = self.policy.initial_delay.as_millis() as f64
            * self.policy.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.policy.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.policy.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(100.0);

        Duration::from_millis(final_ms as u64)
    }
}

/// Extract the server's retry-after hint from the error, if available.
fn rate_limit_delay(error: &ScadCriticError) -> Option<Duration> {
    match error {
        ScadCriticError::RateLimited { retry_after_ms } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Deterministic jitter for a given attempt to keep retries reproducible
/// in tests. Returns a multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64; // 0.0..1.0
    1.0 + fraction * (2.0 * hash - 1.0)
}

macro_rules! retry_loop {
    ($self:expr, $label:expr, $call:expr) => {{
        let attempts = $self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match $call.await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retriable() || attempt + 1 == attempts {
                        return Err(e);
                    }

                    let rl_delay = rate_limit_delay(&e);
                    let delay = $self.delay_for_attempt(attempt, rl_delay);

                    tracing::warn!(
                        client = $self.inner.id(),
                        call = $label,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after error: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(ScadCriticError::Model {
            message: "all retries exhausted".into(),
            retriable: false,
        }))
    }};
}

#[async_trait]
impl ModelClient for RetryClient {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn generate(&self, description: &str, model: &str) -> Result<String, ScadCriticError> {
        retry_loop!(self, "generate", self.inner.generate(description, model))
    }

    async fn converse(
        &self,
        system: &str,
        turns: &[Turn],
        model: &str,
    ) -> Result<String, ScadCriticError> {
        retry_loop!(self, "converse", self.inner.converse(system, turns, model))
    }
}
