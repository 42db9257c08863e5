// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error-recovery primitives: exponential backoff with jitter, a bounded
//! retry loop, and warn-and-continue graceful wrappers.

use crate::error::OrchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff schedule for [`with_retry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_ms: u64,
    pub multiplier: f64,
    pub max_ms: u64,
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { initial_ms: 1000, multiplier: 2.0, max_ms: 30_000, max_retries: 3 }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0-based):
    /// `min(max_ms, initial_ms * multiplier^attempt + jitter)` with jitter
    /// uniform in `[0, 0.2 * base)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_ms as f64 * self.multiplier.powi(attempt as i32);
        let jitter_span = 0.2 * base;
        let jitter = if jitter_span > 0.0 {
            rand::thread_rng().gen_range(0.0..jitter_span)
        } else {
            0.0
        };
        let capped = (base + jitter).min(self.max_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Run `op`, retrying retryable failures with backoff sleeps in between.
///
/// `on_retry` is invoked after each sleep with the 1-based attempt number
/// and the error that triggered it. Non-retryable errors and exhausted
/// budgets rethrow; exhaustion additionally logs at error level.
pub async fn with_retry<T, F, Fut>(
    mut op: F,
    policy: &BackoffPolicy,
    mut on_retry: impl FnMut(u32, &OrchError),
) -> Result<T, OrchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrchError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && err.is_retryable() => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                on_retry(attempt, &err);
            }
            Err(err) => {
                if attempt >= policy.max_retries && err.is_retryable() {
                    tracing::error!(
                        attempts = attempt + 1,
                        error = %err,
                        "retries exhausted"
                    );
                }
                return Err(err);
            }
        }
    }
}

/// Await a fallible future; on error, log at warn and return `None`.
pub async fn graceful<T>(fut: impl Future<Output = Result<T, OrchError>>) -> Option<T> {
    match fut.await {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(graceful_catch = true, error = %err, "suppressed error");
            None
        }
    }
}

/// Synchronous variant of [`graceful`].
pub fn graceful_sync<T>(f: impl FnOnce() -> Result<T, OrchError>) -> Option<T> {
    match f() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(graceful_catch = true, error = %err, "suppressed error");
            None
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
