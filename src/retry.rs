//! Bounded retry for network operations.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Default delay between retry attempts.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Run `operation` up to `max_attempts` times.
///
/// Errors the `is_retriable` predicate rejects are returned immediately;
/// retriable errors are retried after `delay` until the attempt budget
/// is spent, at which point the last error is returned. A zero
/// `max_attempts` is treated as one attempt.
pub async fn retry<T, E, F, Fut, P>(
    operation_name: &str,
    max_attempts: u32,
    delay: Duration,
    is_retriable: P,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !is_retriable(&e) {
                    debug!("{}: non-retriable error: {}", operation_name, e);
                    return Err(e);
                }

                if attempt < max_attempts {
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying...",
                        operation_name, attempt, max_attempts, e
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                last_error = Some(e);
            }
        }
    }

    // max_attempts >= 1, so at least one attempt stored an error.
    Err(last_error.expect("retry ran at least one attempt"))
}
