use crate::agents::generator::DraftGenerator;
use crate::agents::ingestion::IngestionAgent;
use crate::agents::retriever::Retriever;
use crate::agents::reviewer::Reviewer;
use crate::agents::style::StyleProfiler;
use crate::completion::create_completion;
use crate::config::Config;
use crate::embedding::create_embedding_provider;
use crate::index::create_index;
use crate::store::DocumentStore;
use crate::workflow::WorkflowEngine;
use std::sync::Arc;
use std::time::Duration;

/// Review rewrites run cold for consistent formatting.
const REVIEW_TEMPERATURE: f64 = 0.1;

/// Fully wired application: every component constructed once from config.
#[derive(Clone)]
pub struct App {
    pub config: Config,
    pub store: DocumentStore,
    pub engine: Arc<WorkflowEngine>,
    pub ingestion: Arc<IngestionAgent>,
    pub reviewer: Arc<Reviewer>,
}

impl App {
    /// Build against the configured database file.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let store = DocumentStore::open(&config.store.database_path, config.feedback).await?;
        Self::with_store(config, store)
    }

    /// Build against an in-memory database (tests, ephemeral runs).
    pub async fn build_in_memory(config: Config) -> anyhow::Result<Self> {
        let store = DocumentStore::open_in_memory(config.feedback).await?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: DocumentStore) -> anyhow::Result<Self> {
        let embedder = create_embedding_provider(
            &config.embedding.backend,
            config.embedding.api_key.as_deref(),
            &config.embedding.base_url,
            &config.embedding.model,
            config.embedding.dimensions,
        );
        let index = create_index(&config.index, embedder);
        let completion = create_completion(&config.completion, &config.reliability);

        let style_profiler = StyleProfiler::new(
            store.clone(),
            Duration::from_secs(config.workflow.style_cache_ttl_secs),
        );
        let retriever = Retriever::new(Arc::clone(&index));
        let generator =
            DraftGenerator::new(Arc::clone(&completion), config.completion.temperature)?;
        let reviewer = Arc::new(Reviewer::new(Arc::clone(&completion), REVIEW_TEMPERATURE)?);
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
            Arc::clone(&reviewer),
            Arc::clone(&ingestion),
            store.clone(),
            config.workflow.clone(),
            config.retrieval.clone(),
        ));

        Ok(Self {
            config,
            store,
            engine,
            ingestion,
            reviewer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::GenerationRequest;

    #[tokio::test]
    async fn builds_offline_stack_from_defaults() {
        let app = App::build_in_memory(Config::default()).await.unwrap();
        let report = app
            .engine
            .run(GenerationRequest {
                doc_type: "SRS".into(),
                summary: "Inventory system".into(),
                requirements: "- track stock".into(),
                style: "professional".into(),
                max_iterations: Some(3),
                feedback: Vec::new(),
            })
            .await;
        assert_eq!(report.status, "completed");
        assert!(!report.content.is_empty());
    }
}
