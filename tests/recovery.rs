// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry, backoff bounds, and graceful wrappers.

use gf_core::{with_retry, BackoffPolicy, OrchError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn flaky(fail_times: u32, calls: Arc<AtomicU32>) -> impl FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<&'static str, OrchError>> + Send>> {
    move || {
        let calls = Arc::clone(&calls);
        Box::pin(async move {
            if calls.fetch_add(1, Ordering::SeqCst) < fail_times {
                Err(OrchError::Network { message: "flaky".into(), retryable: true })
            } else {
                Ok("success")
            }
        })
    }
}

fn policy(max_retries: u32) -> BackoffPolicy {
    BackoffPolicy { initial_ms: 1, multiplier: 2.0, max_ms: 10, max_retries }
}

#[tokio::test]
async fn flaky_operation_recovers_within_budget() {
    let calls = Arc::new(AtomicU32::new(0));
    let result = with_retry(flaky(2, Arc::clone(&calls)), &policy(3), |_, _| {}).await;
    assert_eq!(result.unwrap(), "success");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn budget_of_one_gives_two_attempts_then_raises() {
    let calls = Arc::new(AtomicU32::new(0));
    let result = with_retry(flaky(99, Arc::clone(&calls)), &policy(1), |_, _| {}).await;
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_retryable_error_is_tried_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls2 = Arc::clone(&calls);
    let result: Result<(), _> = with_retry(
        move || {
            let calls = Arc::clone(&calls2);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(OrchError::internal("boom"))
            })
        },
        &policy(3),
        |_, _| {},
    )
    .await;
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn backoff_stays_within_bounds() {
    let policy = BackoffPolicy::default();
    for attempt in 0..6 {
        let base = 1000f64 * 2f64.powi(attempt as i32);
        let delay = policy.delay_for(attempt).as_millis() as f64;
        let upper = (base * 1.2).min(30_000.0);
        assert!(delay >= base.min(30_000.0) - 1.0, "attempt {attempt}: {delay} < {base}");
        assert!(delay <= upper + 1.0, "attempt {attempt}: {delay} > {upper}");
    }
}

#[tokio::test]
async fn graceful_suppresses_and_returns_none() {
    let ok = gf_core::graceful(async { Ok::<_, OrchError>(1) }).await;
    assert_eq!(ok, Some(1));
    let suppressed =
        gf_core::graceful(async { Err::<i32, _>(OrchError::internal("ignored")) }).await;
    assert_eq!(suppressed, None);
}
