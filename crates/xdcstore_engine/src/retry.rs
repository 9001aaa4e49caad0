//! Retrying store operations with backoff.

use crate::config::RetryConfig;
use std::future::Future;
use tracing::warn;
use xdcstore_storage::StorageResult;

/// Runs `op` until it succeeds, fails permanently, or attempts run out.
///
/// Only [`xdcstore_storage::StorageError::is_transient`] failures are retried.
pub(crate) async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    name: &'static str,
    mut op: F,
) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < attempts => {
                attempt += 1;
                let delay = config.delay_for_attempt(attempt);
                warn!(operation = name, attempt, ?delay, error = %err, "retrying store operation");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use xdcstore_storage::StorageError;

    fn fast(attempts: u32) -> RetryConfig {
        RetryConfig::new(attempts)
            .with_initial_delay(std::time::Duration::from_millis(1))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(3), "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StorageError::Io(io::Error::from(io::ErrorKind::Interrupted)))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: StorageResult<()> = with_retry(&fast(2), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Io(io::Error::from(io::ErrorKind::TimedOut)))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: StorageResult<()> = with_retry(&fast(5), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Closed)
        })
        .await;
        assert!(matches!(result, Err(StorageError::Closed)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
