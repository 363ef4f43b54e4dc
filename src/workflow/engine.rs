use super::state::{GenerationRequest, WorkflowPhase, WorkflowState};
use crate::agents::compliance::check_compliance;
use crate::agents::generator::DraftGenerator;
use crate::agents::ingestion::IngestionAgent;
use crate::agents::retriever::Retriever;
use crate::agents::reviewer::{ReviewType, Reviewer};
use crate::agents::style::StyleProfiler;
use crate::config::{RetrievalConfig, WorkflowConfig};
use crate::store::DocumentStore;
use crate::utils::{truncate_with_ellipsis, word_count};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Routing decision after the compliance node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceRoute {
    Review,
    Finalize,
    Error,
}

/// Routing decision after the review node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewRoute {
    Regenerate,
    Finalize,
    Error,
}

/// Caller-facing result of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub workflow_id: String,
    pub document_id: Option<String>,
    pub content: String,
    pub status: String,
    pub messages: Vec<String>,
    pub quality_score: f64,
    pub agent_executions: Vec<super::state::AgentExecution>,
    pub word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowReport {
    fn from_state(state: WorkflowState) -> Self {
        let content = state.final_document.clone().unwrap_or_default();
        Self {
            workflow_id: state.workflow_id.clone(),
            document_id: state.document_id.clone(),
            word_count: word_count(&content),
            content,
            status: state.workflow_status.to_string(),
            messages: state.messages.clone(),
            quality_score: state.quality_score,
            agent_executions: state.agent_executions.clone(),
            error: state.error_message,
        }
    }
}

/// Directed state machine sequencing style profiling, retrieval, generation,
/// compliance checking, review, and finalization for one document request.
///
/// Reentrant-safe per workflow instance: every run owns its own state record;
/// nothing here mutates shared state across runs.
pub struct WorkflowEngine {
    style_profiler: StyleProfiler,
    retriever: Retriever,
    generator: DraftGenerator,
    reviewer: Arc<Reviewer>,
    ingestion: Arc<IngestionAgent>,
    store: DocumentStore,
    workflow: WorkflowConfig,
    retrieval: RetrievalConfig,
}

impl WorkflowEngine {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        style_profiler: StyleProfiler,
        retriever: Retriever,
        generator: DraftGenerator,
        reviewer: Arc<Reviewer>,
        ingestion: Arc<IngestionAgent>,
        store: DocumentStore,
        workflow: WorkflowConfig,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            style_profiler,
            retriever,
            generator,
            reviewer,
            ingestion,
            store,
            workflow,
            retrieval,
        }
    }

    /// Execute the complete generation workflow.
    ///
    /// Bounded by the configured wall-clock timeout; on expiry the multi-step
    /// run is abandoned and one direct generation call guarantees the caller
    /// still receives a document.
    pub async fn run(&self, request: GenerationRequest) -> WorkflowReport {
        let workflow_id = Uuid::new_v4().to_string();
        tracing::info!(
            workflow_id,
            doc_type = request.doc_type,
            summary = truncate_with_ellipsis(&request.summary, 80),
            "🚀 starting workflow"
        );

        if let Err(e) = self
            .store
            .record_workflow_run(&workflow_id, "document_generation", "initializing", "running")
            .await
        {
            tracing::warn!("workflow run record failed: {e}");
        }

        let max_iterations = request
            .max_iterations
            .unwrap_or(self.workflow.max_iterations);
        let initial = WorkflowState::new(workflow_id.clone(), &request, max_iterations);
        let timeout = Duration::from_secs(self.workflow.timeout_secs.max(1));

        let state = match tokio::time::timeout(timeout, self.drive(initial)).await {
            Ok(state) => state,
            Err(_) => {
                tracing::warn!(workflow_id, "workflow timed out, attempting direct generation");
                return self.direct_generation(&workflow_id, &request).await;
            }
        };

        let status = state.workflow_status.to_string();
        let result_data = serde_json::to_value(&state).ok();
        if let Err(e) = self
            .store
            .complete_workflow_run(
                &workflow_id,
                &status,
                result_data.as_ref(),
                state.error_message.as_deref(),
            )
            .await
        {
            tracing::warn!("workflow completion record failed: {e}");
        }

        tracing::info!(workflow_id, status, "✅ workflow finished");
        WorkflowReport::from_state(state)
    }

    /// Drive the state machine to a terminal state. Never returns an error;
    /// node failures route through the error terminal.
    async fn drive(&self, state: WorkflowState) -> WorkflowState {
        let mut state = Self::initialize(state);

        state = self.build_style_profile(state).await;
        if state.errored() {
            return self.handle_error(state).await;
        }

        state = self.retrieve_context(state).await;
        if state.errored() {
            return self.handle_error(state).await;
        }

        loop {
            state = self.generate_document(state).await;
            if state.errored() {
                return self.handle_error(state).await;
            }

            state = self.compliance_check(state);
            match Self::route_after_compliance(&state) {
                ComplianceRoute::Error => return self.handle_error(state).await,
                ComplianceRoute::Finalize => break,
                ComplianceRoute::Review => {}
            }

            state = self.review_document(state).await;
            match self.route_after_review(&state) {
                ReviewRoute::Error => return self.handle_error(state).await,
                ReviewRoute::Finalize => break,
                ReviewRoute::Regenerate => {
                    tracing::info!(
                        iteration = state.iteration_count,
                        quality = state.quality_score,
                        "quality below threshold, regenerating"
                    );
                }
            }
        }

        let state = self.finalize_document(state).await;
        if state.errored() {
            return self.handle_error(state).await;
        }
        state
    }

    // ── Nodes ───────────────────────────────────────────────────────────

    fn initialize(state: WorkflowState) -> WorkflowState {
        tracing::info!("🛠️ initializing workflow");
        let doc_type = state.doc_type.clone();
        state
            .with_status(WorkflowPhase::Initializing)
            .with_message(format!("Workflow initialized for {doc_type}"))
            .with_execution("initializer", "completed", json!({ "doc_type": doc_type }))
    }

    async fn build_style_profile(&self, state: WorkflowState) -> WorkflowState {
        tracing::info!("🎨 building style profile");
        let doc_types = [state.doc_type.clone()];
        let outcome = self
            .style_profiler
            .build(Some(&doc_types), Some(self.workflow.style_min_feedback_score))
            .await;

        let degraded = outcome.reason().map(str::to_string);
        match outcome.into_value() {
            Some(build) => {
                let mut state = state;
                state.style_profile = Some(build.profile);
                state
                    .with_status(WorkflowPhase::StyleProfileBuilt)
                    .with_message("Style profile built successfully")
                    .with_execution(
                        "style_builder",
                        "completed",
                        json!({
                            "document_count": build.document_count,
                            "degraded": degraded,
                        }),
                    )
            }
            None => state.with_error("style profile construction produced no profile"),
        }
    }

    async fn retrieve_context(&self, state: WorkflowState) -> WorkflowState {
        let query = format!("{} {}", state.summary, state.requirements);
        let outcome = self
            .retriever
            .retrieve(
                &query,
                Some(&state.doc_type),
                Some(self.retrieval.min_feedback_score),
                self.retrieval.top_k,
            )
            .await;

        // Retrieval failure is not fatal to the run — generation degrades to
        // an uncontextualized draft.
        let degraded = outcome.reason().map(str::to_string);
        let chunks = outcome.into_value().map(|c| c.chunks).unwrap_or_default();
        let chunk_count = chunks.len();

        let mut state = state;
        state.retrieved_context = Some(chunks);
        state
            .with_status(WorkflowPhase::ContextRetrieved)
            .with_message(format!("Retrieved {chunk_count} context chunks"))
            .with_execution(
                "retriever",
                "completed",
                json!({
                    "chunk_count": chunk_count,
                    "query": truncate_with_ellipsis(&query, 100),
                    "degraded": degraded,
                }),
            )
    }

    async fn generate_document(&self, state: WorkflowState) -> WorkflowState {
        let mut state = state;
        state.iteration_count += 1;
        let iteration = state.iteration_count;

        let context = state.retrieved_context.clone().unwrap_or_default();
        let outcome = self
            .generator
            .generate(
                &state.doc_type,
                &state.summary,
                &state.requirements,
                &context,
                state.style_profile.as_ref(),
            )
            .await;

        let degraded = outcome.reason().map(str::to_string);
        match outcome.into_value() {
            Some(draft) => {
                state.draft_document = Some(draft.content);
                state
                    .with_status(WorkflowPhase::DocumentGenerated)
                    .with_message(format!("Document generated (iteration {iteration})"))
                    .with_execution(
                        "generator",
                        "completed",
                        json!({
                            "word_count": draft.word_count,
                            "iteration": iteration,
                            "degraded": degraded,
                        }),
                    )
            }
            None => state.with_error("document generation produced no draft"),
        }
    }

    fn compliance_check(&self, state: WorkflowState) -> WorkflowState {
        tracing::info!("✅ checking compliance");
        let content = state.draft_document.clone().unwrap_or_default();
        let report = check_compliance(&state.doc_type, &content, self.workflow.min_word_count);

        let message = if report.compliant {
            "Compliance check: Compliant"
        } else {
            "Compliance check: Issues found"
        };
        let details = json!({
            "compliant": report.compliant,
            "missing_sections": report.missing_sections,
        });

        let mut state = state;
        state.compliance_check = Some(report);
        state
            .with_status(WorkflowPhase::ComplianceChecked)
            .with_message(message)
            .with_execution("compliance_checker", "completed", details)
    }

    async fn review_document(&self, state: WorkflowState) -> WorkflowState {
        let draft = state.draft_document.clone().unwrap_or_default();
        let outcome = self
            .reviewer
            .review(
                &draft,
                &state.doc_type,
                state.style_profile.as_ref(),
                &state.feedback,
                ReviewType::Both,
            )
            .await;

        let mut state = state;
        match outcome {
            crate::agents::Outcome::Ok { value: review }
            | crate::agents::Outcome::Degraded { value: review, .. } => {
                let improvements = review.changes_made.len();
                state.reviewed_document = Some(review.improved_content);
                state = state.with_quality_gain(improvements);
                let quality = state.quality_score;
                state
                    .with_status(WorkflowPhase::DocumentReviewed)
                    .with_message(format!("Document reviewed with {improvements} improvements"))
                    .with_execution(
                        "reviewer",
                        "completed",
                        json!({
                            "improvements_made": improvements,
                            "quality_score": quality,
                        }),
                    )
            }
            crate::agents::Outcome::Failed { reason } => {
                // Review is best-effort: keep the draft and move on.
                tracing::warn!("review failed, keeping draft: {reason}");
                state.reviewed_document = Some(draft);
                let quality = state.quality_score;
                state
                    .with_status(WorkflowPhase::DocumentReviewed)
                    .with_message("Document reviewed with 0 improvements")
                    .with_execution(
                        "reviewer",
                        "completed",
                        json!({
                            "improvements_made": 0,
                            "quality_score": quality,
                            "degraded": reason,
                        }),
                    )
            }
        }
    }

    async fn finalize_document(&self, state: WorkflowState) -> WorkflowState {
        tracing::info!("🏁 finalizing document");
        let final_content = state
            .reviewed_document
            .clone()
            .or_else(|| state.draft_document.clone())
            .unwrap_or_default();

        // Human-scale score derived from the accumulated quality signal.
        let raw_score = state.quality_score.clamp(0.0, 1.0) * 5.0;
        #[allow(clippy::cast_possible_truncation)]
        let feedback_score = (raw_score.round() as i64).clamp(1, 5);

        let filename = format!("final_{}_{}.md", state.doc_type, state.workflow_id);
        let outcome = self
            .ingestion
            .ingest(&filename, &final_content, &state.doc_type, true, feedback_score)
            .await;

        let degraded = outcome.reason().map(str::to_string);
        match outcome.into_value() {
            Some(report) => {
                let words = word_count(&final_content);
                let mut state = state;
                state.final_document = Some(final_content);
                state.document_id = Some(report.document_id.clone());
                let iterations = state.iteration_count;
                state
                    .with_status(WorkflowPhase::Completed)
                    .with_message(format!(
                        "Document finalized with {words} words and stored with ID {}",
                        report.document_id
                    ))
                    .with_execution(
                        "finalizer",
                        "completed",
                        json!({
                            "final_word_count": words,
                            "total_iterations": iterations,
                            "document_id": report.document_id,
                            "feedback_score": feedback_score,
                            "degraded": degraded,
                        }),
                    )
            }
            None => state.with_error("final document persistence failed"),
        }
    }

    async fn handle_error(&self, state: WorkflowState) -> WorkflowState {
        let error_message = state
            .error_message
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string());
        tracing::error!(workflow_id = state.workflow_id, "❌ workflow error: {error_message}");

        if let Err(e) = self
            .store
            .record_agent_run(
                Some(&state.workflow_id),
                "error_handler",
                "failed",
                Some(&error_message),
            )
            .await
        {
            tracing::warn!("error execution record failed: {e}");
        }

        state
            .with_status(WorkflowPhase::Failed)
            .with_message(format!("Workflow failed: {error_message}"))
    }

    // ── Routing guards ──────────────────────────────────────────────────

    /// Post-compliance routing. Review is currently unconditional; the
    /// compliance-gated decision lives in [`compliance_gated_route`] and is
    /// not wired in.
    fn route_after_compliance(state: &WorkflowState) -> ComplianceRoute {
        if state.errored() {
            return ComplianceRoute::Error;
        }
        ComplianceRoute::Review
    }

    fn route_after_review(&self, state: &WorkflowState) -> ReviewRoute {
        if state.errored() {
            return ReviewRoute::Error;
        }
        if state.iteration_count >= state.max_iterations {
            return ReviewRoute::Finalize;
        }
        if state.quality_score >= self.workflow.quality_threshold {
            return ReviewRoute::Finalize;
        }
        ReviewRoute::Regenerate
    }

    /// Timeout fallback: one direct generation with no retrieval or review.
    async fn direct_generation(
        &self,
        workflow_id: &str,
        request: &GenerationRequest,
    ) -> WorkflowReport {
        tracing::info!(workflow_id, "attempting direct document generation");
        let outcome = self
            .generator
            .generate(&request.doc_type, &request.summary, &request.requirements, &[], None)
            .await;

        let content = outcome.into_value().map_or_else(
            || {
                DraftGenerator::fallback_document(
                    &request.doc_type,
                    &request.summary,
                    &request.requirements,
                )
            },
            |draft| draft.content,
        );

        if let Err(e) = self
            .store
            .complete_workflow_run(
                workflow_id,
                "completed",
                None,
                Some("workflow timed out; direct generation used"),
            )
            .await
        {
            tracing::warn!("workflow completion record failed: {e}");
        }

        WorkflowReport {
            workflow_id: workflow_id.to_string(),
            document_id: None,
            word_count: word_count(&content),
            content,
            status: "completed".to_string(),
            messages: vec!["Workflow timed out; direct generation used".to_string()],
            quality_score: super::state::INITIAL_QUALITY_SCORE,
            agent_executions: Vec::new(),
            error: None,
        }
    }
}

/// Compliance-gated routing, currently unused: generation always routes
/// through review. Kept alongside the active guard until the unconditional
/// policy is confirmed as intended.
#[must_use]
pub fn compliance_gated_route(state: &WorkflowState, quality_threshold: f64) -> ComplianceRoute {
    if state.errored() {
        return ComplianceRoute::Error;
    }
    if let Some(check) = &state.compliance_check
        && !check.compliant
    {
        return ComplianceRoute::Review;
    }
    if state.quality_score < quality_threshold {
        return ComplianceRoute::Review;
    }
    ComplianceRoute::Finalize
}
