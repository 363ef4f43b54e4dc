pub mod chunker;

use crate::config::FeedbackConfig;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::str::FromStr;
use uuid::Uuid;

/// A persisted document. `approved` gates inclusion in the style/retrieval
/// corpora; `feedback_score` is the 1–5 human rating that biases both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub title: String,
    pub doc_type: String,
    pub content: String,
    pub status: String,
    pub approved: bool,
    pub feedback_score: i64,
    pub style_metadata: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Caller-supplied id; generated when absent.
    pub id: Option<String>,
    pub filename: String,
    pub title: String,
    pub doc_type: String,
    pub content: String,
    pub approved: bool,
    pub feedback_score: i64,
    pub style_metadata: Option<serde_json::Value>,
    pub chunks: Vec<NewChunk>,
}

#[derive(Debug, Clone)]
pub struct NewChunk {
    pub content: String,
    pub chunk_index: i64,
    pub metadata: serde_json::Value,
    pub vector_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub chunk_index: i64,
    pub metadata: serde_json::Value,
    pub vector_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub doc_type: Option<String>,
    pub approved: Option<bool>,
    pub feedback_score: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub doc_types: Option<Vec<String>>,
    pub approved: Option<bool>,
    pub min_feedback_score: Option<i64>,
}

/// SQLite-backed document repository using a sqlx async pool.
///
/// Document + chunk writes share one transaction; feedback scores are clamped
/// into the configured bounds on every write path.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    feedback: FeedbackConfig,
}

impl DocumentStore {
    /// Open (creating if missing) a database file and run migrations.
    pub async fn open(path: &str, feedback: FeedbackConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))
            .context("parse sqlite path")?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("open sqlite database")?;
        Self::new(pool, feedback).await
    }

    /// In-memory store, used by tests and ephemeral runs.
    pub async fn open_in_memory(feedback: FeedbackConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("open in-memory sqlite database")?;
        Self::new(pool, feedback).await
    }

    /// Create a store over an existing pool and run migrations.
    pub async fn new(pool: SqlitePool, feedback: FeedbackConfig) -> Result<Self> {
        sqlx::query("PRAGMA foreign_keys = ON;")
            .execute(&pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                 id TEXT PRIMARY KEY,
                 filename TEXT NOT NULL,
                 title TEXT NOT NULL,
                 doc_type TEXT NOT NULL,
                 content TEXT NOT NULL,
                 status TEXT NOT NULL DEFAULT 'draft',
                 approved INTEGER NOT NULL DEFAULT 0,
                 feedback_score INTEGER NOT NULL DEFAULT 3,
                 style_metadata TEXT,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS document_chunks (
                 id TEXT PRIMARY KEY,
                 document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                 content TEXT NOT NULL,
                 chunk_index INTEGER NOT NULL,
                 metadata TEXT,
                 vector_id TEXT,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_document_chunks_document
                 ON document_chunks(document_id, chunk_index)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS style_profiles (
                 id TEXT PRIMARY KEY,
                 name TEXT NOT NULL,
                 profile_data TEXT NOT NULL,
                 doc_types TEXT,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS workflow_runs (
                 id TEXT PRIMARY KEY,
                 workflow_type TEXT NOT NULL,
                 current_state TEXT NOT NULL,
                 status TEXT NOT NULL,
                 result_data TEXT,
                 error_message TEXT,
                 created_at TEXT NOT NULL,
                 completed_at TEXT
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS agent_runs (
                 id TEXT PRIMARY KEY,
                 workflow_id TEXT,
                 agent_name TEXT NOT NULL,
                 status TEXT NOT NULL,
                 error_message TEXT,
                 started_at TEXT NOT NULL,
                 completed_at TEXT
             )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool, feedback })
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn feedback_bounds(&self) -> FeedbackConfig {
        self.feedback
    }

    // ── Documents ───────────────────────────────────────────────────────

    /// Insert a document and its chunks in one transaction.
    pub async fn create_document(&self, new: NewDocument) -> Result<Document> {
        let document_id = new
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let timestamp = Utc::now().to_rfc3339();
        let feedback_score = self.feedback.clamp(new.feedback_score);
        let style_metadata = new
            .style_metadata
            .as_ref()
            .map(serde_json::Value::to_string);

        let mut tx = self.pool.begin().await.context("begin transaction")?;

        sqlx::query(
            "INSERT INTO documents
                 (id, filename, title, doc_type, content, status, approved,
                  feedback_score, style_metadata, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 'completed', $6, $7, $8, $9, $9)",
        )
        .bind(&document_id)
        .bind(&new.filename)
        .bind(&new.title)
        .bind(&new.doc_type)
        .bind(&new.content)
        .bind(new.approved)
        .bind(feedback_score)
        .bind(&style_metadata)
        .bind(&timestamp)
        .execute(&mut *tx)
        .await
        .context("insert document")?;

        for chunk in &new.chunks {
            sqlx::query(
                "INSERT INTO document_chunks
                     (id, document_id, content, chunk_index, metadata, vector_id, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&document_id)
            .bind(&chunk.content)
            .bind(chunk.chunk_index)
            .bind(chunk.metadata.to_string())
            .bind(&chunk.vector_id)
            .bind(&timestamp)
            .execute(&mut *tx)
            .await
            .context("insert document chunk")?;
        }

        tx.commit().await.context("commit document insert")?;

        Ok(Document {
            id: document_id,
            filename: new.filename,
            title: new.title,
            doc_type: new.doc_type,
            content: new.content,
            status: "completed".to_string(),
            approved: new.approved,
            feedback_score,
            style_metadata: new.style_metadata,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        })
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, filename, title, doc_type, content, status, approved,
                    feedback_score, style_metadata, created_at, updated_at
             FROM documents
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("query document by id")?;

        row.map(|r| map_document_row(&r)).transpose()
    }

    pub async fn list_documents(&self, query: &DocumentQuery) -> Result<Vec<Document>> {
        let mut sql = String::from(
            "SELECT id, filename, title, doc_type, content, status, approved,
                    feedback_score, style_metadata, created_at, updated_at
             FROM documents WHERE 1 = 1",
        );

        if let Some(doc_types) = &query.doc_types
            && !doc_types.is_empty()
        {
            let placeholders = vec!["?"; doc_types.len()].join(", ");
            sql.push_str(&format!(" AND doc_type IN ({placeholders})"));
        }
        if query.approved.is_some() {
            sql.push_str(" AND approved = ?");
        }
        if query.min_feedback_score.is_some() {
            sql.push_str(" AND feedback_score >= ?");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut db_query = sqlx::query(&sql);
        if let Some(doc_types) = &query.doc_types {
            for doc_type in doc_types {
                db_query = db_query.bind(doc_type);
            }
        }
        if let Some(approved) = query.approved {
            db_query = db_query.bind(approved);
        }
        if let Some(min_score) = query.min_feedback_score {
            db_query = db_query.bind(min_score);
        }

        let rows = db_query
            .fetch_all(&self.pool)
            .await
            .context("list documents")?;
        rows.iter().map(map_document_row).collect()
    }

    pub async fn update_document(
        &self,
        id: &str,
        patch: DocumentPatch,
    ) -> Result<Option<Document>> {
        let Some(mut document) = self.get_document(id).await? else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            document.title = title;
        }
        if let Some(content) = patch.content {
            document.content = content;
        }
        if let Some(doc_type) = patch.doc_type {
            document.doc_type = doc_type;
        }
        if let Some(approved) = patch.approved {
            document.approved = approved;
        }
        if let Some(score) = patch.feedback_score {
            document.feedback_score = self.feedback.clamp(score);
        }
        document.updated_at = Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE documents
             SET title = $1, content = $2, doc_type = $3, approved = $4,
                 feedback_score = $5, updated_at = $6
             WHERE id = $7",
        )
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.doc_type)
        .bind(document.approved)
        .bind(document.feedback_score)
        .bind(&document.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("update document")?;

        Ok(Some(document))
    }

    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete document")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<StoredChunk>> {
        let rows = sqlx::query(
            "SELECT id, document_id, content, chunk_index, metadata, vector_id
             FROM document_chunks
             WHERE document_id = $1
             ORDER BY chunk_index",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .context("query document chunks")?;
        rows.iter().map(map_chunk_row).collect()
    }

    /// Clamp and persist a new feedback score on a document and the metadata
    /// of all of its chunks. Returns the clamped score and the chunks so the
    /// caller can propagate to the vector index.
    pub async fn update_feedback(
        &self,
        document_id: &str,
        score: i64,
    ) -> Result<Option<(i64, Vec<StoredChunk>)>> {
        if self.get_document(document_id).await?.is_none() {
            return Ok(None);
        }

        let clamped = self.feedback.clamp(score);
        let timestamp = Utc::now().to_rfc3339();
        let mut chunks = self.chunks_for_document(document_id).await?;

        let mut tx = self.pool.begin().await.context("begin transaction")?;

        sqlx::query(
            "UPDATE documents SET feedback_score = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(clamped)
        .bind(&timestamp)
        .bind(document_id)
        .execute(&mut *tx)
        .await
        .context("update document feedback score")?;

        for chunk in &mut chunks {
            if let serde_json::Value::Object(map) = &mut chunk.metadata {
                map.insert("feedback_score".into(), serde_json::json!(clamped));
            }
            sqlx::query("UPDATE document_chunks SET metadata = $1 WHERE id = $2")
                .bind(chunk.metadata.to_string())
                .bind(&chunk.id)
                .execute(&mut *tx)
                .await
                .context("update chunk metadata")?;
        }

        tx.commit().await.context("commit feedback update")?;
        Ok(Some((clamped, chunks)))
    }

    // ── Style profiles ──────────────────────────────────────────────────

    pub async fn save_style_profile(
        &self,
        name: &str,
        profile_data: &serde_json::Value,
        doc_types: &[String],
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO style_profiles (id, name, profile_data, doc_types, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&id)
        .bind(name)
        .bind(profile_data.to_string())
        .bind(serde_json::to_string(doc_types).unwrap_or_else(|_| "[]".to_string()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("insert style profile")?;
        Ok(id)
    }

    // ── Workflow telemetry ──────────────────────────────────────────────

    pub async fn record_workflow_run(
        &self,
        workflow_id: &str,
        workflow_type: &str,
        current_state: &str,
        status: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO workflow_runs (id, workflow_type, current_state, status, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(workflow_id)
        .bind(workflow_type)
        .bind(current_state)
        .bind(status)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("insert workflow run")?;
        Ok(())
    }

    pub async fn complete_workflow_run(
        &self,
        workflow_id: &str,
        status: &str,
        result_data: Option<&serde_json::Value>,
        error_message: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE workflow_runs
             SET status = $1, current_state = $1, result_data = $2,
                 error_message = $3, completed_at = $4
             WHERE id = $5",
        )
        .bind(status)
        .bind(result_data.map(serde_json::Value::to_string))
        .bind(error_message)
        .bind(Utc::now().to_rfc3339())
        .bind(workflow_id)
        .execute(&self.pool)
        .await
        .context("complete workflow run")?;
        Ok(())
    }

    pub async fn record_agent_run(
        &self,
        workflow_id: Option<&str>,
        agent_name: &str,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO agent_runs
                 (id, workflow_id, agent_name, status, error_message, started_at, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(&id)
        .bind(workflow_id)
        .bind(agent_name)
        .bind(status)
        .bind(error_message)
        .bind(&timestamp)
        .execute(&self.pool)
        .await
        .context("insert agent run")?;
        Ok(id)
    }
}

fn map_document_row(row: &SqliteRow) -> Result<Document> {
    let style_metadata_raw: Option<String> = row.try_get("style_metadata")?;
    let style_metadata = style_metadata_raw
        .map(|value| serde_json::from_str::<serde_json::Value>(&value))
        .transpose()
        .context("deserialize style metadata")?;

    Ok(Document {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        title: row.try_get("title")?,
        doc_type: row.try_get("doc_type")?,
        content: row.try_get("content")?,
        status: row.try_get("status")?,
        approved: row.try_get("approved")?,
        feedback_score: row.try_get("feedback_score")?,
        style_metadata,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_chunk_row(row: &SqliteRow) -> Result<StoredChunk> {
    let metadata_raw: Option<String> = row.try_get("metadata")?;
    let metadata = metadata_raw
        .map(|value| serde_json::from_str::<serde_json::Value>(&value))
        .transpose()
        .context("deserialize chunk metadata")?
        .unwrap_or(serde_json::Value::Null);

    Ok(StoredChunk {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        content: row.try_get("content")?,
        chunk_index: row.try_get("chunk_index")?,
        metadata,
        vector_id: row.try_get("vector_id")?,
    })
}
