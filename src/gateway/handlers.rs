use super::AppState;
use crate::agents::Outcome;
use crate::agents::reviewer::ReviewType;
use crate::error::InputError;
use crate::store::{DocumentPatch, DocumentQuery};
use crate::workflow::GenerationRequest;
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;

const EXPORTABLE_FORMATS: [&str; 3] = ["pdf", "docx", "latex"];

#[derive(Deserialize)]
pub(super) struct UploadBody {
    pub filename: String,
    pub content: String,
    #[serde(default = "default_doc_type")]
    pub doc_type: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default = "default_feedback_score")]
    pub feedback_score: i64,
}

fn default_doc_type() -> String {
    "auto-detect".to_string()
}

fn default_feedback_score() -> i64 {
    3
}

#[derive(Deserialize)]
pub(super) struct UpdateDocumentBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub doc_type: Option<String>,
    pub approved: Option<bool>,
    pub feedback_score: Option<i64>,
}

#[derive(Deserialize)]
pub(super) struct FeedbackBody {
    pub score: i64,
}

#[derive(Deserialize)]
pub(super) struct ReviewBody {
    pub content: String,
    #[serde(default = "default_review_doc_type")]
    pub doc_type: String,
    #[serde(default)]
    pub feedback: Vec<String>,
    pub review_type: Option<String>,
}

fn default_review_doc_type() -> String {
    "SRS".to_string()
}

#[derive(Deserialize)]
pub(super) struct ExportQuery {
    #[serde(default = "default_export_format")]
    pub format: String,
}

fn default_export_format() -> String {
    "md".to_string()
}

/// GET /health
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// POST /api/generate — run the full generation workflow.
pub(super) async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> impl IntoResponse {
    if request.summary.trim().is_empty() && request.requirements.trim().is_empty() {
        let err = json!({ "error": InputError::MissingGenerationInput.to_string() });
        return (StatusCode::BAD_REQUEST, Json(err));
    }

    let report = state.engine.run(request).await;
    if report.status == "failed" {
        let err = json!({
            "error": report.error.clone().unwrap_or_else(|| "workflow failed".to_string()),
            "workflow_id": report.workflow_id,
            "messages": report.messages,
        });
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(err));
    }

    match serde_json::to_value(&report) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => internal_error(e),
    }
}

/// POST /api/upload — ingest document content.
pub(super) async fn handle_upload(
    State(state): State<AppState>,
    Json(body): Json<UploadBody>,
) -> impl IntoResponse {
    let outcome = state
        .ingestion
        .ingest(
            &body.filename,
            &body.content,
            &body.doc_type,
            body.approved,
            body.feedback_score,
        )
        .await;

    let degraded = outcome.reason().map(str::to_string);
    match outcome.into_value() {
        Some(report) => match serde_json::to_value(&report) {
            Ok(mut value) => {
                if let Some(reason) = degraded
                    && let Some(map) = value.as_object_mut()
                {
                    map.insert("degraded".into(), json!(reason));
                }
                (StatusCode::OK, Json(value))
            }
            Err(e) => internal_error(e),
        },
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "no content extracted from document" })),
        ),
    }
}

/// GET /api/documents
pub(super) async fn handle_list_documents(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_documents(&DocumentQuery::default()).await {
        Ok(documents) => match serde_json::to_value(&documents) {
            Ok(body) => (StatusCode::OK, Json(json!({ "documents": body }))),
            Err(e) => internal_error(e),
        },
        Err(e) => internal_error(e),
    }
}

/// GET /api/documents/{id}
pub(super) async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_document(&id).await {
        Ok(Some(document)) => match serde_json::to_value(&document) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => internal_error(e),
        },
        Ok(None) => not_found(&id),
        Err(e) => internal_error(e),
    }
}

/// PUT /api/documents/{id}
pub(super) async fn handle_update_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateDocumentBody>,
) -> impl IntoResponse {
    let patch = DocumentPatch {
        title: body.title,
        content: body.content,
        doc_type: body.doc_type,
        approved: body.approved,
        feedback_score: body.feedback_score,
    };
    match state.store.update_document(&id, patch).await {
        Ok(Some(document)) => match serde_json::to_value(&document) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => internal_error(e),
        },
        Ok(None) => not_found(&id),
        Err(e) => internal_error(e),
    }
}

/// DELETE /api/documents/{id}
pub(super) async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_document(&id).await {
        Ok(true) => (StatusCode::OK, Json(json!({ "deleted": id }))),
        Ok(false) => not_found(&id),
        Err(e) => internal_error(e),
    }
}

/// PUT /api/documents/{id}/feedback — RLHF score update, clamped to bounds.
pub(super) async fn handle_update_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<FeedbackBody>,
) -> impl IntoResponse {
    match state.ingestion.update_feedback(&id, body.score).await {
        Outcome::Ok { value } => (
            StatusCode::OK,
            Json(json!({ "status": "success", "updated_score": value })),
        ),
        Outcome::Degraded { value, reason } => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "updated_score": value,
                "degraded": reason,
            })),
        ),
        Outcome::Failed { reason } if reason.contains("not found") => not_found(&id),
        Outcome::Failed { reason } => internal_error(reason),
    }
}

/// POST /api/review — formatting/feedback rewrite of submitted content.
pub(super) async fn handle_review(
    State(state): State<AppState>,
    Json(body): Json<ReviewBody>,
) -> impl IntoResponse {
    if body.content.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "content must not be empty" })),
        );
    }

    let review_type = match &body.review_type {
        Some(raw) => match ReviewType::from_str(raw) {
            Ok(parsed) => parsed,
            Err(_) => {
                let err = json!({ "error": format!("invalid review_type: {raw}") });
                return (StatusCode::BAD_REQUEST, Json(err));
            }
        },
        None if body.feedback.is_empty() => ReviewType::Formatting,
        None => ReviewType::Both,
    };

    let outcome = state
        .reviewer
        .review(&body.content, &body.doc_type, None, &body.feedback, review_type)
        .await;

    match outcome.into_value() {
        Some(review) => match serde_json::to_value(&review) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => internal_error(e),
        },
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "review failed" })),
        ),
    }
}

/// GET /api/export/{id}?format=md — markdown passthrough; converter-backed
/// formats report 501 until a converter is wired in.
pub(super) async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> axum::response::Response {
    let document = match state.store.get_document(&id).await {
        Ok(Some(document)) => document,
        Ok(None) => return not_found(&id).into_response(),
        Err(e) => return internal_error(e).into_response(),
    };

    match query.format.as_str() {
        "md" | "markdown" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            document.content,
        )
            .into_response(),
        format if EXPORTABLE_FORMATS.contains(&format) => (
            StatusCode::NOT_IMPLEMENTED,
            Json(json!({ "error": format!("export backend for '{format}' is not available") })),
        )
            .into_response(),
        format => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": InputError::UnsupportedFormat(format.to_string()).to_string()
            })),
        )
            .into_response(),
    }
}

fn not_found(id: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": InputError::DocumentNotFound(id.to_string()).to_string() })),
    )
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!("gateway internal error: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}
