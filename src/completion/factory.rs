use super::{Completion, OpenAiCompletion, ReliableCompletion, StubCompletion};
use crate::config::{CompletionConfig, ReliabilityConfig};
use std::sync::Arc;

/// Build the completion capability from config.
///
/// Remote backend requires an API key; without one the deterministic stub is
/// selected so generation keeps working offline. The result is always wrapped
/// in the retry layer.
pub fn create_completion(
    config: &CompletionConfig,
    reliability: &ReliabilityConfig,
) -> Arc<dyn Completion> {
    let inner: Box<dyn Completion> = match config.backend.as_str() {
        "stub" => Box::new(StubCompletion::new()),
        _ => match config.api_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => Box::new(OpenAiCompletion::new(
                &config.base_url,
                Some(key),
                &config.model,
                config.max_tokens,
            )),
            None => {
                tracing::warn!(
                    "no completion API key configured — using deterministic stub backend"
                );
                Box::new(StubCompletion::new())
            }
        },
    };

    Arc::new(ReliableCompletion::new(
        inner,
        reliability.retries,
        reliability.backoff_base_ms,
        reliability.backoff_cap_ms,
    ))
}
