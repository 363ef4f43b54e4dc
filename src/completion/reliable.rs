use super::{Completion, CompletionRequest};
use crate::error::CompletionError;
use async_trait::async_trait;
use std::time::Duration;

/// Check if an error is non-retryable (client errors that won't resolve with retries).
fn is_non_retryable(err: &anyhow::Error) -> bool {
    let msg = err.to_string();
    if is_quota_exhausted(&msg) {
        return true;
    }

    if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>()
        && let Some(status) = reqwest_err.status()
    {
        let code = status.as_u16();
        // 4xx client errors are non-retryable, except:
        // - 429 Too Many Requests (rate limiting, transient)
        // - 408 Request Timeout (transient)
        return status.is_client_error() && code != 429 && code != 408;
    }
    // String fallback: scan for any 4xx status code in error message
    for word in msg.split(|c: char| !c.is_ascii_digit()) {
        if let Ok(code) = word.parse::<u16>()
            && (400..500).contains(&code)
        {
            return code != 429 && code != 408;
        }
    }
    false
}

fn is_quota_exhausted(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("insufficient_quota")
        || lower.contains("exceeded your current quota")
        || lower.contains("billing")
}

/// Completion wrapper with retry + exponential backoff behavior.
pub struct ReliableCompletion {
    inner: Box<dyn Completion>,
    attempts: u32,
    base_backoff_ms: u64,
    cap_backoff_ms: u64,
}

impl ReliableCompletion {
    pub fn new(
        inner: Box<dyn Completion>,
        attempts: u32,
        base_backoff_ms: u64,
        cap_backoff_ms: u64,
    ) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            base_backoff_ms: base_backoff_ms.max(50),
            cap_backoff_ms: cap_backoff_ms.max(50),
        }
    }
}

#[async_trait]
impl Completion for ReliableCompletion {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let mut backoff_ms = self.base_backoff_ms.min(self.cap_backoff_ms);
        let mut failures = Vec::new();

        for attempt in 1..=self.attempts {
            match self.inner.complete(request).await {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::info!(
                            backend = self.inner.name(),
                            attempt,
                            "completion recovered after retries"
                        );
                    }
                    return Ok(text);
                }
                Err(e) => {
                    let non_retryable = is_non_retryable(&e);
                    failures.push(format!("attempt {attempt}/{}: {e}", self.attempts));

                    if non_retryable {
                        tracing::warn!(
                            backend = self.inner.name(),
                            "non-retryable completion error, giving up"
                        );
                        break;
                    }

                    if attempt < self.attempts {
                        tracing::warn!(
                            backend = self.inner.name(),
                            attempt,
                            max_attempts = self.attempts,
                            "completion call failed, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        backoff_ms = backoff_ms.saturating_mul(2).min(self.cap_backoff_ms);
                    }
                }
            }
        }

        Err(CompletionError::RetriesExhausted {
            attempts: self.attempts,
            message: failures.join("; "),
        }
        .into())
    }
}
