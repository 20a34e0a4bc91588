use std::thread;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use specqa_core::config::Settings;

use crate::generator::{GenerationRequest, Generator};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation failed after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Bounded exponential backoff between generation attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Adds up to a quarter of the delay at random.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(2), max_delay: Duration::from_secs(30), jitter: true }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.generation_max_attempts.max(1),
            base_delay: Duration::from_millis(settings.generation_base_delay_ms),
            ..Self::default()
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self { Self { max_attempts: 1, base_delay: Duration::ZERO, max_delay: Duration::ZERO, jitter: false } }

    /// Wait before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if !self.jitter || delay.is_zero() { return delay; }
        let extra = rand::thread_rng().gen_range(0.0..=0.25);
        delay.mul_f64(1.0 + extra)
    }
}

/// Wraps a generator and re-runs it under a [`RetryPolicy`].
pub struct RetryingGenerator<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: Generator> RetryingGenerator<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self { Self { inner, policy } }

    pub fn policy(&self) -> &RetryPolicy { &self.policy }

    pub fn generate_with_retry(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.inner.generate(request) {
                Ok(answer) => {
                    if attempt > 1 { debug!(attempt, "generation succeeded after retry"); }
                    return Ok(answer);
                }
                Err(e) => {
                    warn!(attempt, max = attempts, error = %e, "generation attempt failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        thread::sleep(self.policy.delay_for(attempt));
                    }
                }
            }
        }
        Err(GenerationError::Exhausted { attempts, last_error })
    }
}

impl<G: Generator> Generator for RetryingGenerator<G> {
    fn generate(&self, request: &GenerationRequest<'_>) -> anyhow::Result<String> {
        Ok(self.generate_with_retry(request)?)
    }

    fn name(&self) -> &str { self.inner.name() }
}
