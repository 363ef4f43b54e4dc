use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for Draftsmith.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum DraftError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Caller input ────────────────────────────────────────────────────
    #[error("input: {0}")]
    Input(#[from] InputError),

    // ── Completion capability ───────────────────────────────────────────
    #[error("completion: {0}")]
    Completion(#[from] CompletionError),

    // ── Similarity index ────────────────────────────────────────────────
    #[error("index: {0}")]
    Index(#[from] IndexError),

    // ── Document store ──────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Workflow ────────────────────────────────────────────────────────
    #[error("workflow: {0}")]
    Workflow(#[from] WorkflowError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Input errors (surface as structured results, never a crash) ────────────

#[derive(Debug, Error)]
pub enum InputError {
    #[error("empty query provided")]
    EmptyQuery,

    #[error("either summary or requirements must be provided")]
    MissingGenerationInput,

    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),
}

// ─── Completion capability errors ───────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("backend {backend} request failed: {message}")]
    Request { backend: String, message: String },

    #[error("backend {backend} returned an empty completion")]
    Empty { backend: String },

    #[error("retries exhausted after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

// ─── Similarity index errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("upsert failed: {0}")]
    Upsert(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("backend not available: {0}")]
    BackendUnavailable(String),
}

// ─── Document store errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("sqlx: {0}")]
    Sqlx(String),
}

// ─── Workflow errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("node {node} failed: {message}")]
    Node { node: String, message: String },

    #[error("workflow {workflow_id} timed out")]
    Timeout { workflow_id: String },

    #[error("iteration budget exceeded: {count} > {max}")]
    IterationBudget { count: u32, max: u32 },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, DraftError>;
