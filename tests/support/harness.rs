// Shared helpers for integration suites. Each suite uses a subset.
#![allow(dead_code)]

use async_trait::async_trait;
use draftsmith::agents::generator::DraftGenerator;
use draftsmith::agents::ingestion::IngestionAgent;
use draftsmith::agents::retriever::Retriever;
use draftsmith::agents::reviewer::Reviewer;
use draftsmith::agents::style::StyleProfiler;
use draftsmith::completion::{Completion, CompletionRequest, StubCompletion};
use draftsmith::config::Config;
use draftsmith::embedding::HashEmbedding;
use draftsmith::index::{LocalIndex, SimilarityIndex};
use draftsmith::store::DocumentStore;
use draftsmith::workflow::{GenerationRequest, WorkflowEngine};
use std::sync::Arc;
use std::time::Duration;

/// Offline config: deterministic stub completion, local index, fast retries.
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.completion.backend = "stub".to_string();
    config.reliability.retries = 2;
    config.reliability.backoff_base_ms = 1;
    config.reliability.backoff_cap_ms = 2;
    config
}

pub fn request(doc_type: &str, summary: &str, requirements: &str, max_iterations: u32) -> GenerationRequest {
    GenerationRequest {
        doc_type: doc_type.to_string(),
        summary: summary.to_string(),
        requirements: requirements.to_string(),
        style: "professional".to_string(),
        max_iterations: Some(max_iterations),
        feedback: Vec::new(),
    }
}

/// Wire a workflow engine around an arbitrary completion backend.
pub async fn engine_with_completion(
    completion: Arc<dyn Completion>,
    config: &Config,
) -> (Arc<WorkflowEngine>, DocumentStore) {
    let store = DocumentStore::open_in_memory(config.feedback).await.unwrap();
    let index: Arc<dyn SimilarityIndex> =
        Arc::new(LocalIndex::new(Arc::new(HashEmbedding::new(64))));

    let style_profiler = StyleProfiler::new(
        store.clone(),
        Duration::from_secs(config.workflow.style_cache_ttl_secs),
    );
    let retriever = Retriever::new(Arc::clone(&index));
    let generator =
        DraftGenerator::new(Arc::clone(&completion), config.completion.temperature).unwrap();
    let reviewer = Arc::new(Reviewer::new(Arc::clone(&completion), 0.1).unwrap());
    let ingestion = Arc::new(IngestionAgent::new(
        store.clone(),
        Arc::clone(&index),
        &config.ingestion,
        config.reliability,
    ));

    let engine = Arc::new(WorkflowEngine::new(
        style_profiler,
        retriever,
        generator,
        reviewer,
        ingestion,
        store.clone(),
        config.workflow.clone(),
        config.retrieval.clone(),
    ));
    (engine, store)
}

/// Deterministic stub, used where tests just need a working backend.
pub fn stub_completion() -> Arc<dyn Completion> {
    Arc::new(StubCompletion::new())
}

/// Completion backend that always errors.
pub struct FailingCompletion;

#[async_trait]
impl Completion for FailingCompletion {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<String> {
        anyhow::bail!("model unavailable")
    }
}

/// Stub wrapped in an artificial delay, for timeout-path tests.
pub struct SlowCompletion {
    pub delay: Duration,
    pub inner: StubCompletion,
}

#[async_trait]
impl Completion for SlowCompletion {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        tokio::time::sleep(self.delay).await;
        self.inner.complete(request).await
    }
}

/// Stub producing a long, fully compliant SRS draft.
pub struct CompliantCompletion;

#[async_trait]
impl Completion for CompliantCompletion {
    fn name(&self) -> &str {
        "compliant"
    }

    async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<String> {
        let mut content = String::from(
            "# SRS: Inventory system\n\n## Introduction\nScope overview.\n\n\
             ## Requirements\nThe system shall track stock.\n\n\
             ## Specifications\nBarcode scanning is supported.\n\n",
        );
        content.push_str(&"The system shall remain responsive under load. ".repeat(80));
        content.push_str("\n\n## Conclusion\nComprehensive framework.\n");
        Ok(content)
    }
}
