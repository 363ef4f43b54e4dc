//! Axum-based HTTP gateway for the document-generation backend.
//!
//! Status-code contract: 400 for missing/invalid input, 404 for a missing
//! document, 500 for internal failure, 501 for export formats whose
//! converter backend is not available.

mod handlers;

use crate::agents::ingestion::IngestionAgent;
use crate::agents::reviewer::Reviewer;
use crate::app::App;
use crate::config::GatewayConfig;
use crate::store::DocumentStore;
use crate::workflow::WorkflowEngine;
use anyhow::Result;
use axum::{
    Router,
    routing::{get, post, put},
};
use handlers::{
    handle_delete_document, handle_export, handle_generate, handle_get_document, handle_health,
    handle_list_documents, handle_review, handle_update_document, handle_update_feedback,
    handle_upload,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
    pub store: DocumentStore,
    pub ingestion: Arc<IngestionAgent>,
    pub reviewer: Arc<Reviewer>,
}

impl From<&App> for AppState {
    fn from(app: &App) -> Self {
        Self {
            engine: Arc::clone(&app.engine),
            store: app.store.clone(),
            ingestion: Arc::clone(&app.ingestion),
            reviewer: Arc::clone(&app.reviewer),
        }
    }
}

pub fn build_router(state: AppState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/generate", post(handle_generate))
        .route("/api/upload", post(handle_upload))
        .route("/api/documents", get(handle_list_documents))
        .route(
            "/api/documents/{id}",
            get(handle_get_document)
                .put(handle_update_document)
                .delete(handle_delete_document),
        )
        .route("/api/documents/{id}/feedback", put(handle_update_feedback))
        .route("/api/review", post(handle_review))
        .route("/api/export/{id}", get(handle_export))
        .layer(RequestBodyLimitLayer::new(gateway.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            gateway.request_timeout_secs,
        )))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP gateway.
pub async fn run_gateway(app: &App) -> Result<()> {
    let gateway = app.config.gateway.clone();
    let addr: SocketAddr = format!("{}:{}", gateway.host, gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_gateway_with_listener(app, listener).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    app: &App,
    listener: tokio::net::TcpListener,
) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("🌐 gateway listening on {addr}");
    let router = build_router(AppState::from(app), &app.config.gateway);
    axum::serve(listener, router).await?;
    Ok(())
}
