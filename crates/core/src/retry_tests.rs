// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn fast_policy(max_retries: u32) -> BackoffPolicy {
    BackoffPolicy { initial_ms: 1, multiplier: 2.0, max_ms: 10, max_retries }
}

fn network_error() -> OrchError {
    OrchError::Network { message: "connection reset".into(), retryable: true }
}

#[tokio::test]
async fn flaky_operation_succeeds_within_budget() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls2 = Arc::clone(&calls);
    let result = with_retry(
        move || {
            let calls = Arc::clone(&calls2);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(network_error())
                } else {
                    Ok(42)
                }
            }
        },
        &fast_policy(3),
        |_, _| {},
    )
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn budget_of_one_allows_two_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls2 = Arc::clone(&calls);
    let result: Result<(), _> = with_retry(
        move || {
            let calls = Arc::clone(&calls2);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(network_error())
            }
        },
        &fast_policy(1),
        |_, _| {},
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_retryable_error_is_invoked_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls2 = Arc::clone(&calls);
    let result: Result<(), _> = with_retry(
        move || {
            let calls = Arc::clone(&calls2);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(OrchError::internal("boom"))
            }
        },
        &fast_policy(3),
        |_, _| {},
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retry_callback_sees_each_attempt() {
    let attempts = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let attempts2 = Arc::clone(&attempts);
    let calls = Arc::new(AtomicU32::new(0));
    let calls2 = Arc::clone(&calls);
    let _ = with_retry(
        move || {
            let calls = Arc::clone(&calls2);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(network_error())
                } else {
                    Ok(())
                }
            }
        },
        &fast_policy(5),
        move |attempt, err| {
            attempts2.lock().push((attempt, err.to_string()));
        },
    )
    .await;

    let seen = attempts.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, 1);
    assert_eq!(seen[1].0, 2);
    assert!(seen[0].1.contains("connection reset"));
}

#[tokio::test]
async fn graceful_swallows_errors() {
    let ok = graceful(async { Ok::<_, OrchError>(7) }).await;
    assert_eq!(ok, Some(7));
    let err = graceful(async { Err::<u32, _>(OrchError::internal("nope")) }).await;
    assert_eq!(err, None);
}

#[test]
fn graceful_sync_swallows_errors() {
    assert_eq!(graceful_sync(|| Ok::<_, OrchError>("fine")), Some("fine"));
    assert_eq!(graceful_sync(|| Err::<(), _>(OrchError::internal("nope"))), None);
}

proptest! {
    // delay_for(n) lands in [base, min(max, base * 1.2)] for base <= max.
    #[test]
    fn backoff_respects_bounds(attempt in 0u32..8, initial in 1u64..2000) {
        let policy = BackoffPolicy {
            initial_ms: initial,
            multiplier: 2.0,
            max_ms: 30_000,
            max_retries: 3,
        };
        let base = (initial as f64) * 2f64.powi(attempt as i32);
        let delay = policy.delay_for(attempt).as_millis() as f64;
        let upper = (base * 1.2).min(30_000.0);
        prop_assert!(delay >= base.min(30_000.0).floor() - 1.0, "delay {delay} below base {base}");
        prop_assert!(delay <= upper + 1.0, "delay {delay} above cap {upper}");
    }
}

#[test]
fn backoff_caps_at_max() {
    let policy = BackoffPolicy { initial_ms: 1000, multiplier: 2.0, max_ms: 5_000, max_retries: 3 };
    for attempt in 0..12 {
        assert!(policy.delay_for(attempt).as_millis() <= 5_000);
    }
}

#[test]
fn backoff_grows_until_cap() {
    let policy = BackoffPolicy::default();
    // Without jitter the sequence would be 1000, 2000, 4000; jitter adds at
    // most 20%, so attempt 1's floor (2000) clears attempt 0's ceiling (1200).
    assert!(policy.delay_for(1) > policy.delay_for(0));
}
