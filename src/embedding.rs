use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trait for embedding providers — convert text to vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts into vectors
    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut results = self.embed(&[text]).await?;
        results
            .pop()
            .ok_or_else(|| anyhow::anyhow!("empty embedding result"))
    }
}

// ── Hashed bag-of-words provider (deterministic, offline) ────

/// Local embedding via token hashing: each lowercased token is projected into
/// the vector space with an FNV-seeded splitmix sequence, token vectors are
/// summed, and the result is L2-normalized. Texts sharing tokens land close
/// together, which is what the local fallback index needs; no model, no
/// network, bit-for-bit reproducible.
pub struct HashEmbedding {
    dims: usize,
}

impl HashEmbedding {
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(8) }
    }

    fn fnv1a64(bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for &b in bytes {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }

    fn splitmix64(mut x: u64) -> u64 {
        x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = x;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    #[allow(clippy::cast_precision_loss)]
    fn u64_to_unit_f32(x: u64) -> f32 {
        const U24_MAX: f32 = ((1u32 << 24) - 1) as f32;
        let top_u24: u32 = (x >> 40) as u32;
        (top_u24 as f32 / U24_MAX) * 2.0 - 1.0
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dims];
        let lowered = text.to_lowercase();
        let mut token_count = 0_usize;

        for token in lowered.split(|c: char| !c.is_alphanumeric()) {
            if token.len() < 2 {
                continue;
            }
            token_count += 1;
            let base = Self::fnv1a64(token.as_bytes());
            for (i, slot) in v.iter_mut().enumerate() {
                let mixed = Self::splitmix64(base ^ (i as u64));
                *slot += Self::u64_to_unit_f32(mixed);
            }
        }

        if token_count == 0 {
            return v;
        }

        let norm = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
        if norm > f64::EPSILON {
            #[allow(clippy::cast_possible_truncation)]
            for slot in &mut v {
                *slot = (f64::from(*slot) / norm) as f32;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

// ── OpenAI-compatible embedding provider ─────────────────────

pub struct OpenAiEmbedding {
    client: reqwest::Client,
    cached_embeddings_url: String,
    cached_auth_header: String,
    model: String,
    dims: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedding {
    pub fn new(base_url: &str, api_key: &str, model: &str, dims: usize) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            cached_embeddings_url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            cached_auth_header: format!("Bearer {api_key}"),
            model: model.to_string(),
            dims,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.cached_embeddings_url)
            .header("Authorization", &self.cached_auth_header)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .context("embedding request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("embedding API returned {status}: {body}");
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("embedding response JSON decode failed")?;
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

// ── Factory ──────────────────────────────────────────────────

pub fn create_embedding_provider(
    backend: &str,
    api_key: Option<&str>,
    base_url: &str,
    model: &str,
    dims: usize,
) -> Arc<dyn EmbeddingProvider> {
    match (backend, api_key.filter(|k| !k.is_empty())) {
        ("openai", Some(key)) => Arc::new(OpenAiEmbedding::new(base_url, key, model, dims)),
        ("openai", None) => {
            tracing::warn!("no embedding API key configured — using hashed local embeddings");
            Arc::new(HashEmbedding::new(dims))
        }
        _ => Arc::new(HashEmbedding::new(dims)),
    }
}
