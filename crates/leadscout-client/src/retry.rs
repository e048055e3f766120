//! Retry with exponential back-off and jitter for idempotent backend calls.
//!
//! [`retry_with_backoff`] wraps a fallible async operation and retries it on
//! transient errors (see [`ClientError::is_transient`]). Everything else is
//! returned on the first failure.

use std::future::Future;
use std::time::Duration;

use leadscout_core::MAX_RETRY_DELAY_MS;

use crate::error::ClientError;

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 500`:
///
/// | Attempt | Sleep before next attempt     |
/// |---------|-------------------------------|
/// | 1       | 500 ms × 2⁰ ± 25 % jitter     |
/// | 2       | 500 ms × 2¹ ± 25 % jitter     |
/// | 3       | 500 ms × 2² ± 25 % jitter     |
///
/// Delay is capped at 30 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = backoff_delay_ms(backoff_base_ms, attempt, &err);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "backend transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32, err: &ClientError) -> u64 {
    // A server-provided Retry-After wins over the computed schedule.
    if let ClientError::RateLimited { retry_after_secs } = err {
        if *retry_after_secs > 0 {
            return retry_after_secs.saturating_mul(1_000).min(MAX_RETRY_DELAY_MS);
        }
    }
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_RETRY_DELAY_MS);
    (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64
}
