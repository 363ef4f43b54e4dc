use super::Outcome;
use crate::index::{ScoredChunk, SearchFilter, SimilarityIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Cap on the over-fetch used to give the reranker headroom.
const MAX_SEARCH_K: usize = 20;
/// Broadened fallback queries keep this many leading words.
const BROAD_QUERY_WORDS: usize = 3;
/// Result count for the broadened fallback search.
const BROAD_SEARCH_K: usize = 5;
/// Dedup key length for diversity-fallback results.
const DEDUP_PREFIX_CHARS: usize = 100;

const RELEVANCE_WEIGHT: f64 = 0.7;
const FEEDBACK_WEIGHT: f64 = 0.3;
/// Neutral feedback assumed when a chunk carries none.
const NEUTRAL_FEEDBACK: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetrievedContext {
    pub chunks: Vec<ScoredChunk>,
    pub total_results: usize,
}

/// Retrieval ranker: similarity search with metadata filters, graceful
/// degradation to broader queries, and relevance/feedback score fusion.
pub struct Retriever {
    index: Arc<dyn SimilarityIndex>,
}

impl Retriever {
    #[must_use]
    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self { index }
    }

    /// Fused ranking score: weighted relevance plus normalized feedback.
    fn fused_score(chunk: &ScoredChunk) -> f64 {
        let relevance = chunk.score.clamp(0.0, 1.0);
        let feedback = chunk
            .metadata
            .parsed_feedback_score()
            .unwrap_or(NEUTRAL_FEEDBACK);
        #[allow(clippy::cast_precision_loss)]
        let normalized_feedback = if feedback > 0 {
            (feedback - 1) as f64 / 4.0
        } else {
            0.0
        };
        RELEVANCE_WEIGHT * relevance + FEEDBACK_WEIGHT * normalized_feedback
    }

    /// Stable descending sort by fused score — ties keep prior order.
    fn rerank(chunks: &mut [ScoredChunk]) {
        chunks.sort_by(|a, b| {
            Self::fused_score(b)
                .partial_cmp(&Self::fused_score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    fn dedup_key(content: &str) -> String {
        content.chars().take(DEDUP_PREFIX_CHARS).collect()
    }

    pub async fn retrieve(
        &self,
        query: &str,
        doc_type: Option<&str>,
        min_feedback_score: Option<i64>,
        top_k: usize,
    ) -> Outcome<RetrievedContext> {
        if query.trim().is_empty() {
            return Outcome::failed(crate::error::InputError::EmptyQuery.to_string());
        }

        let top_k = top_k.max(1);
        let search_k = (top_k * 2).min(MAX_SEARCH_K);
        let native = self.index.supports_native_filter();
        let filter = SearchFilter {
            doc_type: doc_type.map(str::to_string),
            min_feedback_score,
        };

        tracing::info!(
            query = crate::utils::truncate_with_ellipsis(query, 100),
            ?doc_type,
            ?min_feedback_score,
            "🔍 retrieving context"
        );

        let mut degradations: Vec<String> = Vec::new();
        let mut stage_errors = 0_u32;
        let mut used_unfiltered = false;

        // Filtered search (the local backend ignores the filter and relies on
        // the post-filter below).
        let mut chunks = match self.index.search(query, search_k, Some(&filter)).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("filtered search failed: {e}");
                stage_errors += 1;
                Vec::new()
            }
        };

        // Graceful degradation: retry the identical query with no filter.
        if chunks.is_empty() {
            match self.index.search(query, search_k, None).await {
                Ok(results) if !results.is_empty() => {
                    used_unfiltered = true;
                    degradations.push("unfiltered fallback search".to_string());
                    chunks = results;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("unfiltered fallback search failed: {e}");
                    stage_errors += 1;
                }
            }
        }

        // Post-filter by feedback score when the backend has no native
        // filtering. Unparseable scores pass (fail-open).
        if !native && let Some(min_score) = min_feedback_score {
            chunks.retain(|chunk| {
                chunk
                    .metadata
                    .parsed_feedback_score()
                    .is_none_or(|score| score >= min_score)
            });
        }

        // Exact doc-type equality; a no-op where the backend already
        // guaranteed it, load-bearing after an unfiltered fallback.
        if let Some(doc_type) = doc_type
            && (!native || used_unfiltered)
        {
            chunks.retain(|chunk| chunk.metadata.doc_type == doc_type);
        }

        Self::rerank(&mut chunks);
        chunks.truncate(top_k);

        // Diversity fallback: too few results on a long query — broaden to
        // the first few words and append anything new.
        let words: Vec<&str> = query.split_whitespace().collect();
        if chunks.len() < 2 && words.len() > BROAD_QUERY_WORDS {
            let broad_query = words[..BROAD_QUERY_WORDS].join(" ");
            tracing::info!(broad_query, "trying broader search");
            match self.index.search(&broad_query, BROAD_SEARCH_K, None).await {
                Ok(broader) => {
                    let mut seen: HashSet<String> =
                        chunks.iter().map(|c| Self::dedup_key(&c.content)).collect();
                    let mut appended = false;
                    for chunk in broader {
                        if chunks.len() >= top_k {
                            break;
                        }
                        let key = Self::dedup_key(&chunk.content);
                        if seen.insert(key) {
                            chunks.push(chunk);
                            appended = true;
                        }
                    }
                    if appended {
                        degradations.push("broadened query fallback".to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!("broader search failed: {e}");
                    stage_errors += 1;
                }
            }
        }

        let context = RetrievedContext {
            total_results: chunks.len(),
            chunks,
        };

        tracing::info!(count = context.total_results, "retrieved context chunks");

        if context.chunks.is_empty() && stage_errors > 0 {
            return Outcome::failed("similarity search unavailable");
        }
        if degradations.is_empty() {
            Outcome::ok(context)
        } else {
            Outcome::degraded(context, degradations.join("; "))
        }
    }
}
