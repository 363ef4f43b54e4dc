mod local;
mod remote;

pub use local::LocalIndex;
pub use remote::RemoteIndex;

use crate::config::IndexConfig;
use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Relevance assigned when a backend cannot supply a similarity score.
pub const DEFAULT_RELEVANCE: f64 = 0.5;

/// Metadata stored alongside each indexed chunk.
///
/// `feedback_score` stays loosely typed: backends and historical records may
/// carry it as an integer, float, or string, and filtering is fail-open on
/// values that do not parse.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub doc_type: String,
    #[serde(default)]
    pub feedback_score: serde_json::Value,
    #[serde(default)]
    pub chunk_index: usize,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub char_count: usize,
    #[serde(default)]
    pub approved: bool,
}

impl ChunkMetadata {
    /// Parse the feedback score from whatever representation it arrived in.
    #[must_use]
    pub fn parsed_feedback_score(&self) -> Option<i64> {
        match &self.feedback_score {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64)),
            serde_json::Value::String(s) => {
                s.trim().parse::<f64>().ok().map(|f| f.round() as i64)
            }
            _ => None,
        }
    }
}

/// A unit of retrieved prior content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Relevance in [0, 1].
    pub score: f64,
}

/// Metadata filter for similarity queries.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub doc_type: Option<String>,
    pub min_feedback_score: Option<i64>,
}

impl SearchFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc_type.is_none() && self.min_feedback_score.is_none()
    }
}

/// Nearest-neighbor search over embedded text chunks.
///
/// Exactly two implementations exist, selected once at startup: the remote
/// index with native metadata filtering and the local fallback index without
/// it. Callers post-filter when `supports_native_filter` is false.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    fn name(&self) -> &str;

    fn supports_native_filter(&self) -> bool;

    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> anyhow::Result<Vec<ScoredChunk>>;

    async fn upsert(&self, chunks: Vec<(String, ChunkMetadata)>) -> anyhow::Result<Vec<String>>;

    async fn update_metadata(&self, id: &str, feedback_score: i64) -> anyhow::Result<bool>;
}

/// Select the similarity backend once at startup.
///
/// Remote requires credentials and a well-formed base URL; any construction
/// failure logs a warning and silently falls back to the local index.
pub fn create_index(
    config: &IndexConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Arc<dyn SimilarityIndex> {
    if config.backend == "local" {
        return Arc::new(LocalIndex::new(embedder));
    }

    match config.api_key.as_deref().filter(|key| !key.is_empty()) {
        Some(key) => match RemoteIndex::new(
            config.base_url.as_deref(),
            key,
            &config.namespace,
            Arc::clone(&embedder),
        ) {
            Ok(remote) => Arc::new(remote),
            Err(e) => {
                tracing::warn!("remote index init failed: {e}, falling back to local index");
                Arc::new(LocalIndex::new(embedder))
            }
        },
        None => {
            if config.backend == "remote" {
                tracing::warn!("remote index requested without api_key — using local index");
            }
            Arc::new(LocalIndex::new(embedder))
        }
    }
}
