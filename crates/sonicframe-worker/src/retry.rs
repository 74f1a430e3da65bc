//! Fixed-delay-list retry helper for stage workers.
//!
//! Grounded on the teacher's `vclip-firestore::retry::with_retry`, but
//! spec'd stage retry policies give an explicit delay list per attempt
//! (spec §4.3.1-4.3.5: "2/4/8s", "5/10s", "3/6s", ...) rather than a
//! computed exponential curve, so this helper takes the list directly
//! instead of rebuilding it from a base/multiplier.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Runs `op` once, then retries on `Err` using `delays[attempt]` as the
/// sleep before the next attempt. `delays.len()` retries are available
/// beyond the first try. Returns the last error if every attempt fails.
pub async fn retry_with_delays<T, E, F, Fut>(stage: &str, delays: &[Duration], mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if (attempt as usize) >= delays.len() {
                    return Err(e);
                }
                let delay = delays[attempt as usize];
                warn!(stage, attempt, delay_ms = delay.as_millis(), error = %e, "stage attempt failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Exponential backoff with a fixed base, used by the Upload worker
/// (spec §4.3.5: "exponential backoff, base 1s").
pub fn exponential_delays(base: Duration, retries: u32) -> Vec<Duration> {
    (0..retries).map(|i| base * 2u32.pow(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_retrying_within_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_delays("test", &[Duration::from_millis(1), Duration::from_millis(1)], |_attempt| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err("transient") } else { Ok(42) } }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_exhausting_delay_list() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_delays("test", &[Duration::from_millis(1)], |_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err("permanent") }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn exponential_delays_double_each_step() {
        let delays = exponential_delays(Duration::from_secs(1), 3);
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]);
    }
}
