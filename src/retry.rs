//! Bounded retry helper shared by fetch and upload.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Run `op` up to `max_attempts` times, sleeping `delay` between attempts.
///
/// Each failure is logged with `what` for context. The final error is
/// returned unchanged once attempts are exhausted.
pub async fn attempt<T, F, Fut>(
    what: &str,
    max_attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    debug_assert!(max_attempts >= 1);
    let mut last_err = None;

    for n in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{} failed (attempt {}/{}): {:#}", what, n, max_attempts, e);
                last_err = Some(e);
            }
        }
        if n < max_attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} failed with no attempts made", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let out = attempt("op", 3, Duration::from_millis(0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let calls = AtomicU32::new(0);
        let out = attempt("op", 3, Duration::from_millis(0), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    anyhow::bail!("transient");
                }
                Ok("ok")
            }
        })
        .await
        .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let err = attempt::<(), _, _>("op", 3, Duration::from_millis(0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { anyhow::bail!("still broken") }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("still broken"));
    }
}
