use std::future::Future;
use std::time::Duration;

/// Run `op` up to `attempts` times with exponential backoff between failures.
///
/// Backoff starts at `base_ms`, doubles per attempt, and is capped at
/// `cap_ms`. The final error is returned once the budget is exhausted.
pub async fn with_backoff<T, F, Fut>(
    label: &str,
    attempts: u32,
    base_ms: u64,
    cap_ms: u64,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = attempts.max(1);
    let mut backoff_ms = base_ms.max(1).min(cap_ms.max(1));
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation = label, attempt, "recovered after retries");
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(
                    operation = label,
                    attempt,
                    max_attempts = attempts,
                    "operation failed: {e}"
                );
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = backoff_ms.saturating_mul(2).min(cap_ms.max(1));
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{label}: no attempts executed")))
}
