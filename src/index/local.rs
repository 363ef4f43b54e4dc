use super::{ChunkMetadata, ScoredChunk, SearchFilter, SimilarityIndex};
use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Cosine similarity between two vectors. Returns 0.0–1.0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if !denom.is_finite() || denom < f64::EPSILON {
        return 0.0;
    }

    let raw = dot / denom;
    if !raw.is_finite() {
        return 0.0;
    }

    raw.clamp(0.0, 1.0)
}

struct LocalEntry {
    id: String,
    content: String,
    vector: Vec<f32>,
    metadata: ChunkMetadata,
}

/// In-process brute-force cosine index — the fallback when the remote index
/// is unavailable.
///
/// No native metadata filtering: the filter argument is ignored and callers
/// post-filter. Search never fails; infrastructure problems degrade to an
/// empty result set.
pub struct LocalIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: RwLock<Vec<LocalEntry>>,
}

impl LocalIndex {
    #[must_use]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SimilarityIndex for LocalIndex {
    fn name(&self) -> &str {
        "local"
    }

    fn supports_native_filter(&self) -> bool {
        false
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        _filter: Option<&SearchFilter>,
    ) -> anyhow::Result<Vec<ScoredChunk>> {
        let query_vector = match self.embedder.embed_one(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("local index query embedding failed: {e}");
                return Ok(Vec::new());
            }
        };

        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredChunk> = entries
            .iter()
            .map(|entry| ScoredChunk {
                content: entry.content.clone(),
                metadata: entry.metadata.clone(),
                score: cosine_similarity(&query_vector, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn upsert(&self, chunks: Vec<(String, ChunkMetadata)>) -> anyhow::Result<Vec<String>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = chunks.iter().map(|(content, _)| content.as_str()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        anyhow::ensure!(
            vectors.len() == chunks.len(),
            "embedding count mismatch: {} texts, {} vectors",
            chunks.len(),
            vectors.len()
        );

        let mut entries = self.entries.write().await;
        let mut ids = Vec::with_capacity(chunks.len());
        for ((content, metadata), vector) in chunks.into_iter().zip(vectors) {
            let id = Uuid::new_v4().to_string();
            entries.push(LocalEntry {
                id: id.clone(),
                content,
                vector,
                metadata,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn update_metadata(&self, id: &str, feedback_score: i64) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        for entry in entries.iter_mut() {
            if entry.id == id {
                entry.metadata.feedback_score = serde_json::json!(feedback_score);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedding;

    fn index() -> LocalIndex {
        LocalIndex::new(Arc::new(HashEmbedding::new(128)))
    }

    fn metadata(doc_type: &str, score: i64) -> ChunkMetadata {
        ChunkMetadata {
            document_id: "doc-1".into(),
            doc_type: doc_type.into(),
            feedback_score: serde_json::json!(score),
            ..ChunkMetadata::default()
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 0.001);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn cosine_empty_returns_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn upsert_then_search_returns_most_similar_first() {
        let index = index();
        index
            .upsert(vec![
                (
                    "inventory stock levels and warehouse tracking".into(),
                    metadata("SRS", 4),
                ),
                (
                    "quarterly payroll ledger and tax filings".into(),
                    metadata("Business", 3),
                ),
            ])
            .await
            .unwrap();

        let results = index
            .search("inventory stock tracking", 2, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.contains("inventory"));
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn search_empty_index_returns_empty() {
        let index = index();
        let results = index.search("anything", 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_truncates_to_k() {
        let index = index();
        let chunks = (0..5)
            .map(|i| (format!("chunk number {i} about inventory"), metadata("SRS", 3)))
            .collect();
        index.upsert(chunks).await.unwrap();

        let results = index.search("inventory", 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn filter_argument_is_ignored() {
        let index = index();
        index
            .upsert(vec![("a business plan overview".into(), metadata("Business", 2))])
            .await
            .unwrap();

        let filter = SearchFilter {
            doc_type: Some("SRS".into()),
            min_feedback_score: Some(5),
        };
        let results = index
            .search("business plan", 5, Some(&filter))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn update_metadata_rewrites_feedback_score() {
        let index = index();
        let ids = index
            .upsert(vec![("some chunk".into(), metadata("SRS", 2))])
            .await
            .unwrap();

        assert!(index.update_metadata(&ids[0], 5).await.unwrap());
        let results = index.search("some chunk", 1, None).await.unwrap();
        assert_eq!(results[0].metadata.parsed_feedback_score(), Some(5));

        assert!(!index.update_metadata("missing-id", 5).await.unwrap());
    }
}
