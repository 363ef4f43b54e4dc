use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
///
/// Loaded once at startup from TOML (every field defaulted) and passed into
/// components at construction. Core algorithms never read ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) if p.is_file() => Self::load(p),
            Some(p) => Err(ConfigError::Load(format!("{}: not a file", p.display()))),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingestion.chunk_size == 0 {
            return Err(ConfigError::Validation("chunk_size must be > 0".into()));
        }
        if self.ingestion.chunk_overlap >= self.ingestion.chunk_size {
            return Err(ConfigError::Validation(
                "chunk_overlap must be smaller than chunk_size".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Validation("top_k must be > 0".into()));
        }
        if self.feedback.min_score > self.feedback.max_score {
            return Err(ConfigError::Validation(
                "feedback min_score must be <= max_score".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.workflow.quality_threshold) {
            return Err(ConfigError::Validation(
                "quality_threshold must be within 0.0..=1.0".into(),
            ));
        }
        Ok(())
    }
}

// ─── Completion ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// "openai" (OpenAI-compatible chat endpoint) | "stub"
    #[serde(default = "default_completion_backend")]
    pub backend: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            backend: default_completion_backend(),
            api_key: None,
            base_url: default_completion_base_url(),
            model: default_completion_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_completion_backend() -> String {
    "openai".to_string()
}

fn default_completion_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_completion_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> u32 {
    8192
}

// ─── Embedding ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "hash" (deterministic local) | "openai" (remote endpoint)
    #[serde(default = "default_embedding_backend")]
    pub backend: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dims")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            api_key: None,
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimensions: default_embedding_dims(),
        }
    }
}

fn default_embedding_backend() -> String {
    "hash".to_string()
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dims() -> usize {
    384
}

// ─── Similarity index ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// "auto" (remote when credentials present, else local) | "remote" | "local"
    #[serde(default = "default_index_backend")]
    pub backend: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_index_namespace")]
    pub namespace: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            api_key: None,
            base_url: None,
            namespace: default_index_namespace(),
        }
    }
}

fn default_index_backend() -> String {
    "auto".to_string()
}

fn default_index_namespace() -> String {
    "default".to_string()
}

// ─── Document store ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "./draftsmith.db".to_string()
}

// ─── Ingestion ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

// ─── Retrieval ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum feedback score used by the workflow for retrieval filtering.
    #[serde(default = "default_min_feedback_score_filter")]
    pub min_feedback_score: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_feedback_score: default_min_feedback_score_filter(),
        }
    }
}

fn default_top_k() -> usize {
    8
}

fn default_min_feedback_score_filter() -> i64 {
    3
}

// ─── Workflow ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Post-review quality at or above this finalizes instead of regenerating.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    /// Drafts below this word count are flagged as incomplete.
    #[serde(default = "default_min_word_count")]
    pub min_word_count: usize,
    /// End-to-end wall-clock bound for one generation run.
    #[serde(default = "default_workflow_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_style_cache_ttl_secs")]
    pub style_cache_ttl_secs: u64,
    /// Minimum feedback score for documents feeding the style profile.
    #[serde(default = "default_style_min_feedback_score")]
    pub style_min_feedback_score: i64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            quality_threshold: default_quality_threshold(),
            min_word_count: default_min_word_count(),
            timeout_secs: default_workflow_timeout_secs(),
            style_cache_ttl_secs: default_style_cache_ttl_secs(),
            style_min_feedback_score: default_style_min_feedback_score(),
        }
    }
}

fn default_max_iterations() -> u32 {
    3
}

fn default_quality_threshold() -> f64 {
    0.7
}

fn default_min_word_count() -> usize {
    500
}

fn default_workflow_timeout_secs() -> u64 {
    300
}

fn default_style_cache_ttl_secs() -> u64 {
    300
}

fn default_style_min_feedback_score() -> i64 {
    3
}

// ─── Feedback ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_feedback_min")]
    pub min_score: i64,
    #[serde(default = "default_feedback_max")]
    pub max_score: i64,
}

impl FeedbackConfig {
    /// Clamp a raw score into the configured bounds.
    #[must_use]
    pub fn clamp(&self, score: i64) -> i64 {
        score.clamp(self.min_score, self.max_score)
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            min_score: default_feedback_min(),
            max_score: default_feedback_max(),
        }
    }
}

fn default_feedback_min() -> i64 {
    1
}

fn default_feedback_max() -> i64 {
    5
}

// ─── Reliability ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
        }
    }
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    4_000
}

fn default_backoff_cap_ms() -> u64 {
    10_000
}

// ─── Gateway ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    1_048_576
}

fn default_request_timeout_secs() -> u64 {
    330
}
