use super::{ChunkMetadata, DEFAULT_RELEVANCE, ScoredChunk, SearchFilter, SimilarityIndex};
use crate::embedding::EmbeddingProvider;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

/// Cloud-hosted vector index with native metadata filtering, spoken to over
/// a Pinecone-style JSON API.
pub struct RemoteIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    namespace: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[allow(dead_code)]
    id: String,
    score: Option<f64>,
    metadata: Option<Value>,
}

impl RemoteIndex {
    pub fn new(
        base_url: Option<&str>,
        api_key: &str,
        namespace: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> anyhow::Result<Self> {
        let base_url = base_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow::anyhow!("remote index base_url not configured"))?;
        reqwest::Url::parse(base_url).context("remote index base_url is not a valid URL")?;

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            namespace: namespace.to_string(),
            embedder,
        })
    }

    fn native_filter(filter: &SearchFilter) -> Option<Value> {
        if filter.is_empty() {
            return None;
        }
        let mut clauses = serde_json::Map::new();
        if let Some(doc_type) = &filter.doc_type {
            clauses.insert("doc_type".into(), json!({ "$eq": doc_type }));
        }
        if let Some(min_score) = filter.min_feedback_score {
            clauses.insert("feedback_score".into(), json!({ "$gte": min_score }));
        }
        Some(Value::Object(clauses))
    }

    fn chunk_from_match(m: QueryMatch) -> ScoredChunk {
        let mut metadata_value = m.metadata.unwrap_or(Value::Null);
        let content = metadata_value
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Value::Object(map) = &mut metadata_value {
            map.remove("content");
        }
        let metadata: ChunkMetadata =
            serde_json::from_value(metadata_value).unwrap_or_default();

        ScoredChunk {
            content,
            metadata,
            score: m.score.unwrap_or(DEFAULT_RELEVANCE).clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl SimilarityIndex for RemoteIndex {
    fn name(&self) -> &str {
        "remote"
    }

    fn supports_native_filter(&self) -> bool {
        true
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> anyhow::Result<Vec<ScoredChunk>> {
        let query_vector = match self.embedder.embed_one(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("remote index query embedding failed: {e}");
                return Ok(Vec::new());
            }
        };

        let mut body = json!({
            "vector": query_vector,
            "topK": k,
            "namespace": self.namespace,
            "includeMetadata": true,
        });
        if let Some(native) = filter.and_then(Self::native_filter) {
            body["filter"] = native;
        }

        let response = match self
            .client
            .post(format!("{}/query", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("remote index query failed: {e}");
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "remote index query rejected");
            return Ok(Vec::new());
        }

        let parsed: QueryResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("remote index response decode failed: {e}");
                return Ok(Vec::new());
            }
        };

        Ok(parsed.matches.into_iter().map(Self::chunk_from_match).collect())
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

        let mut ids = Vec::with_capacity(chunks.len());
        let mut records = Vec::with_capacity(chunks.len());
        for ((content, metadata), vector) in chunks.into_iter().zip(vectors) {
            let id = Uuid::new_v4().to_string();
            let mut metadata_value =
                serde_json::to_value(&metadata).context("serialize chunk metadata")?;
            if let Value::Object(map) = &mut metadata_value {
                map.insert("content".into(), Value::String(content));
            }
            records.push(json!({
                "id": id,
                "values": vector,
                "metadata": metadata_value,
            }));
            ids.push(id);
        }

        let response = self
            .client
            .post(format!("{}/vectors/upsert", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(&json!({ "vectors": records, "namespace": self.namespace }))
            .send()
            .await
            .context("remote index upsert failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(
                crate::error::IndexError::Upsert(format!("remote index returned {status}")).into(),
            );
        }
        Ok(ids)
    }

    async fn update_metadata(&self, id: &str, feedback_score: i64) -> anyhow::Result<bool> {
        let response = self
            .client
            .post(format!("{}/vectors/update", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(&json!({
                "id": id,
                "setMetadata": { "feedback_score": feedback_score },
                "namespace": self.namespace,
            }))
            .send()
            .await
            .context("remote index metadata update failed")?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedding;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashEmbedding::new(16))
    }

    fn remote(base_url: &str) -> RemoteIndex {
        RemoteIndex::new(Some(base_url), "test-key", "default", embedder()).unwrap()
    }

    #[test]
    fn new_rejects_missing_or_invalid_url() {
        assert!(RemoteIndex::new(None, "key", "ns", embedder()).is_err());
        assert!(RemoteIndex::new(Some(""), "key", "ns", embedder()).is_err());
        assert!(RemoteIndex::new(Some("not a url"), "key", "ns", embedder()).is_err());
    }

    #[test]
    fn native_filter_builds_clauses() {
        let filter = SearchFilter {
            doc_type: Some("SRS".into()),
            min_feedback_score: Some(3),
        };
        let value = RemoteIndex::native_filter(&filter).unwrap();
        assert_eq!(value["doc_type"]["$eq"], "SRS");
        assert_eq!(value["feedback_score"]["$gte"], 3);

        assert!(RemoteIndex::native_filter(&SearchFilter::default()).is_none());
    }

    #[tokio::test]
    async fn search_parses_matches_and_defaults_score() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(serde_json::json!({ "topK": 5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "matches": [
                    {
                        "id": "a",
                        "score": 0.9,
                        "metadata": {
                            "content": "prior SRS text",
                            "doc_type": "SRS",
                            "feedback_score": 4
                        }
                    },
                    { "id": "b", "metadata": { "content": "unscored chunk" } }
                ]
            })))
            .mount(&server)
            .await;

        let index = remote(&server.uri());
        let results = index.search("inventory", 5, None).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "prior SRS text");
        assert_eq!(results[0].metadata.doc_type, "SRS");
        assert!((results[0].score - 0.9).abs() < 1e-9);
        assert!((results[1].score - DEFAULT_RELEVANCE).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failed_query_degrades_to_empty_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let index = remote(&server.uri());
        let results = index.search("anything", 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_degrades_to_empty_results() {
        let index = remote("http://127.0.0.1:1");
        let results = index.search("anything", 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn upsert_posts_vectors_and_returns_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "upsertedCount": 1 })),
            )
            .mount(&server)
            .await;

        let index = remote(&server.uri());
        let ids = index
            .upsert(vec![("chunk text".into(), ChunkMetadata::default())])
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn update_metadata_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/update"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let index = remote(&server.uri());
        assert!(index.update_metadata("some-id", 5).await.unwrap());
    }
}
