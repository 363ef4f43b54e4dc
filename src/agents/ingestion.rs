use super::Outcome;
use crate::config::{IngestionConfig, ReliabilityConfig};
use crate::index::{ChunkMetadata, SimilarityIndex};
use crate::retry;
use crate::store::{DocumentStore, NewChunk, NewDocument, chunker};
use crate::utils::word_count;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

static HASH_HEADERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s").expect("static pattern"));
static NUMBERED_SECTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\.\s").expect("static pattern"));
static LETTERED_SECTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[a-zA-Z]\.\s").expect("static pattern"));
static BULLET_POINTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[-*•]\s").expect("static pattern"));
static NUMBERED_LISTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\)\s").expect("static pattern"));
static DASH_LISTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^-\s").expect("static pattern"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*.*?\*\*").expect("static pattern"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*.*?\*").expect("static pattern"));
static CODE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("static pattern"));
static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`.*?`").expect("static pattern"));

/// Filename and content patterns per detectable document type, checked in
/// order; first hit wins.
const TYPE_PATTERNS: &[(&str, &[&str], &[&str])] = &[
    (
        "SRS",
        &["srs", "requirements", "specification", "req"],
        &[
            "software requirements",
            "functional requirements",
            "non-functional requirements",
        ],
    ),
    (
        "SOW",
        &["sow", "statement", "work", "scope"],
        &["statement of work", "deliverables", "timeline", "project scope"],
    ),
    (
        "Proposal",
        &["proposal", "rfp", "bid", "quote"],
        &["proposal", "budget", "cost estimate"],
    ),
    (
        "Technical",
        &["technical", "api", "documentation", "tech", "guide"],
        &["api documentation", "technical specification", "architecture"],
    ),
    (
        "Business",
        &["business", "plan", "strategy", "market"],
        &["business plan", "market analysis", "financial projections"],
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: String,
    pub doc_type: String,
    pub chunk_count: usize,
    pub vector_ids: Vec<String>,
    pub word_count: usize,
}

/// Ingests document content: style-metadata extraction, type detection,
/// chunking, transactional persistence, and vector-index upsert. Also owns
/// the RLHF feedback-update path.
pub struct IngestionAgent {
    store: DocumentStore,
    index: Arc<dyn SimilarityIndex>,
    chunk_size: usize,
    chunk_overlap: usize,
    reliability: ReliabilityConfig,
}

impl IngestionAgent {
    #[must_use]
    pub fn new(
        store: DocumentStore,
        index: Arc<dyn SimilarityIndex>,
        ingestion: &IngestionConfig,
        reliability: ReliabilityConfig,
    ) -> Self {
        Self {
            store,
            index,
            chunk_size: ingestion.chunk_size,
            chunk_overlap: ingestion.chunk_overlap,
            reliability,
        }
    }

    pub async fn ingest(
        &self,
        filename: &str,
        content: &str,
        doc_type: &str,
        approved: bool,
        feedback_score: i64,
    ) -> Outcome<IngestReport> {
        let content = content.trim();
        if content.is_empty() {
            return Outcome::failed("no content extracted from document");
        }

        let doc_type = if doc_type.is_empty() || doc_type == "auto-detect" {
            detect_doc_type(content, filename)
        } else {
            doc_type.to_string()
        };

        tracing::info!(filename, doc_type, "📥 ingesting document");

        let document_id = Uuid::new_v4().to_string();
        let style_metadata = extract_style_metadata(content);
        let clamped_score = self.store.feedback_bounds().clamp(feedback_score);

        let pieces = chunker::split_text(content, self.chunk_size, self.chunk_overlap);
        let chunk_metadata: Vec<ChunkMetadata> = pieces
            .iter()
            .enumerate()
            .map(|(i, piece)| ChunkMetadata {
                document_id: document_id.clone(),
                doc_type: doc_type.clone(),
                feedback_score: serde_json::json!(clamped_score),
                chunk_index: i,
                word_count: word_count(piece),
                char_count: piece.chars().count(),
                approved,
            })
            .collect();

        // Vector indexing is best-effort; persistence still proceeds.
        let mut degradation = None;
        let vector_ids = match self
            .index
            .upsert(
                pieces
                    .iter()
                    .cloned()
                    .zip(chunk_metadata.iter().cloned())
                    .collect(),
            )
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("vector index upsert failed: {e}");
                degradation = Some(format!("vector index upsert failed: {e}"));
                Vec::new()
            }
        };

        let chunks: Vec<NewChunk> = pieces
            .iter()
            .enumerate()
            .map(|(i, piece)| NewChunk {
                content: piece.clone(),
                chunk_index: i as i64,
                metadata: serde_json::to_value(&chunk_metadata[i])
                    .unwrap_or(serde_json::Value::Null),
                vector_id: vector_ids.get(i).cloned(),
            })
            .collect();

        let new_document = NewDocument {
            id: Some(document_id),
            filename: filename.to_string(),
            title: title_from_filename(filename),
            doc_type: doc_type.clone(),
            content: content.to_string(),
            approved,
            feedback_score: clamped_score,
            style_metadata: Some(style_metadata),
            chunks,
        };

        let reliability = self.reliability;
        let store = self.store.clone();
        let created = retry::with_backoff(
            "document ingest",
            reliability.retries,
            reliability.backoff_base_ms,
            reliability.backoff_cap_ms,
            move || {
                let store = store.clone();
                let new_document = new_document.clone();
                async move { store.create_document(new_document).await }
            },
        )
        .await;

        match created {
            Ok(document) => {
                let report = IngestReport {
                    document_id: document.id,
                    doc_type,
                    chunk_count: pieces.len(),
                    vector_ids,
                    word_count: word_count(content),
                };
                match degradation {
                    None => Outcome::ok(report),
                    Some(reason) => Outcome::degraded(report, reason),
                }
            }
            Err(e) => Outcome::failed(format!("document persistence failed: {e}")),
        }
    }

    /// Clamp and persist a new human feedback score, propagating it to chunk
    /// metadata and (best-effort) to the vector index.
    pub async fn update_feedback(&self, document_id: &str, score: i64) -> Outcome<i64> {
        let reliability = self.reliability;
        let store = self.store.clone();
        let document_id_owned = document_id.to_string();
        let updated = retry::with_backoff(
            "feedback update",
            reliability.retries,
            reliability.backoff_base_ms,
            reliability.backoff_cap_ms,
            move || {
                let store = store.clone();
                let document_id = document_id_owned.clone();
                async move { store.update_feedback(&document_id, score).await }
            },
        )
        .await;

        let (clamped, chunks) = match updated {
            Ok(Some(result)) => result,
            Ok(None) => return Outcome::failed("document not found"),
            Err(e) => return Outcome::failed(format!("feedback update failed: {e}")),
        };

        let mut index_failures = 0_usize;
        for chunk in &chunks {
            if let Some(vector_id) = &chunk.vector_id
                && let Err(e) = self.index.update_metadata(vector_id, clamped).await
            {
                tracing::warn!(vector_id, "vector metadata update failed: {e}");
                index_failures += 1;
            }
        }

        if index_failures > 0 {
            Outcome::degraded(
                clamped,
                format!("{index_failures} vector metadata updates failed"),
            )
        } else {
            Outcome::ok(clamped)
        }
    }
}

/// Detect document type from filename and content patterns.
#[must_use]
pub fn detect_doc_type(content: &str, filename: &str) -> String {
    let content_lower = content.to_lowercase();
    let filename_lower = filename.to_lowercase();

    for (doc_type, file_patterns, content_patterns) in TYPE_PATTERNS {
        if file_patterns.iter().any(|p| filename_lower.contains(p)) {
            return (*doc_type).to_string();
        }
        let content_hits: usize = content_patterns
            .iter()
            .map(|p| content_lower.matches(p).count())
            .sum();
        if content_hits > 0 {
            return (*doc_type).to_string();
        }
    }

    "General".to_string()
}

/// Count formatting patterns used later to preserve a document's style.
#[must_use]
pub fn extract_style_metadata(content: &str) -> serde_json::Value {
    serde_json::json!({
        "heading_patterns": {
            "hash_headers": HASH_HEADERS_RE.find_iter(content).count(),
            "numbered_sections": NUMBERED_SECTIONS_RE.find_iter(content).count(),
            "lettered_sections": LETTERED_SECTIONS_RE.find_iter(content).count(),
        },
        "list_indicators": {
            "bullet_points": BULLET_POINTS_RE.find_iter(content).count(),
            "numbered_lists": NUMBERED_LISTS_RE.find_iter(content).count(),
            "dash_lists": DASH_LISTS_RE.find_iter(content).count(),
        },
        "formatting_patterns": {
            "bold_text": BOLD_RE.find_iter(content).count(),
            "italic_text": ITALIC_RE.find_iter(content).count(),
            "code_blocks": CODE_BLOCK_RE.find_iter(content).count(),
            "inline_code": INLINE_CODE_RE.find_iter(content).count(),
        },
    })
}

fn title_from_filename(filename: &str) -> String {
    let spaced = filename.replace(['_', '-'], " ");
    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
