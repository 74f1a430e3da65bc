//! Narrow retry helper: retries exactly once on a disposed-session error.
//!
//! Grounded on the teacher's `vclip-firestore::retry::with_retry`, but
//! deliberately smaller — spec §4.4 calls for a single retry class
//! ("disposed session"), not a general exponential-backoff policy. Stage
//! retry/backoff policy lives in `sonicframe-worker`, not here.

use tracing::warn;

use crate::error::{StoreError, StoreResult};

pub async fn with_disposed_retry<T, F, Fut>(operation: &str, op: F) -> StoreResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = StoreResult<T>>,
{
    match op().await {
        Ok(v) => Ok(v),
        Err(e) if e.is_disposed() => {
            warn!(operation, "store session disposed, retrying once with a fresh session");
            op().await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_exactly_once_on_disposed() {
        let calls = AtomicU32::new(0);
        let result = with_disposed_retry("test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(StoreError::Disposed("gone".into()))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_other_errors() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = with_disposed_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::NotFound("x".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
