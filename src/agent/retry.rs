//! Retry controller for transient agent failures.

use super::types::InvocationOutcome;
use crate::config::RetrySettings;
use crate::config::types::MAX_RETRIES_LIMIT;
use std::time::Duration;

/// Gap added per extra delay when fewer delays than retries are configured.
const DELAY_EXTENSION: Duration = Duration::from_secs(2);

/// How many times to re-attempt and how long to wait before each retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_retries,
            settings
                .delays_seconds
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        )
    }
}

impl RetryPolicy {
    /// Create a policy; `delays` is extended by `last + 2s` steps until it
    /// covers every retry. `max_retries` is capped at `MAX_RETRIES_LIMIT`.
    pub fn new(max_retries: u32, mut delays: Vec<Duration>) -> Self {
        if max_retries > MAX_RETRIES_LIMIT {
            tracing::warn!(
                requested = max_retries,
                limit = MAX_RETRIES_LIMIT,
                "capping retry count"
            );
        }
        let max_retries = max_retries.min(MAX_RETRIES_LIMIT);

        while delays.len() < max_retries as usize {
            let next = delays
                .last()
                .map_or(Duration::from_secs(1), |last| *last + DELAY_EXTENSION);
            delays.push(next);
        }

        Self { max_retries, delays }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_before(&self, retry: u32) -> Duration {
        let index = retry.saturating_sub(1) as usize;
        self.delays.get(index).copied().unwrap_or_default()
    }
}

/// Run `attempt` until it succeeds, fails non-retryably, or the policy is
/// exhausted. Returns the last outcome.
///
/// `sleep` is called with the delay before each retry.
pub fn run_with_retry<A, S>(
    policy: &RetryPolicy,
    mut sleep: S,
    mut attempt: A,
) -> InvocationOutcome
where
    A: FnMut() -> InvocationOutcome,
    S: FnMut(Duration),
{
    let mut outcome = attempt();

    for retry in 1..=policy.max_retries() {
        if outcome.success || !outcome.retry_code.is_retryable() {
            return outcome;
        }

        let delay = policy.delay_before(retry);
        tracing::warn!(
            retry,
            max_retries = policy.max_retries(),
            retry_code = %outcome.retry_code,
            delay_seconds = delay.as_secs_f64(),
            "agent attempt failed, retrying"
        );
        sleep(delay);

        outcome = attempt();
    }

    if !outcome.success && outcome.retry_code.is_retryable() {
        tracing::warn!(
            attempts = policy.max_attempts(),
            retry_code = %outcome.retry_code,
            "agent retries exhausted"
        );
    }

    outcome
}
