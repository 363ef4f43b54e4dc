use crate::agents::compliance::ComplianceReport;
use crate::agents::style::StyleProfile;
use crate::index::ScoredChunk;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Initial quality score for every run; reviews only raise it.
pub const INITIAL_QUALITY_SCORE: f64 = 0.7;
/// Quality gained per change a review pass makes.
pub const QUALITY_PER_CHANGE: f64 = 0.05;

/// Closed set of workflow phases. `Error` marks a node failure on its way to
/// the `Failed` terminal; `Completed` and `Failed` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Initializing,
    StyleProfileBuilt,
    ContextRetrieved,
    DocumentGenerated,
    ComplianceChecked,
    DocumentReviewed,
    Completed,
    Error,
    Failed,
}

/// One audit-log entry per agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecution {
    pub agent: String,
    pub status: String,
    pub timestamp: String,
    pub details: serde_json::Value,
}

/// Inputs for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub doc_type: String,
    pub summary: String,
    pub requirements: String,
    #[serde(default = "default_style")]
    pub style: String,
    /// Caller-supplied iteration bound; the configured default applies when
    /// absent.
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub feedback: Vec<String>,
}

fn default_style() -> String {
    "professional".to_string()
}

/// State record threaded through the state machine for one generation run.
///
/// Nodes consume the state by value and return a new one; the append-only
/// lists (`messages`, `agent_executions`) grow by concatenation, never by
/// shared-aliasing mutation. One record exists per `workflow_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub doc_type: String,
    pub summary: String,
    pub requirements: String,
    pub style: String,

    pub style_profile: Option<StyleProfile>,
    pub retrieved_context: Option<Vec<ScoredChunk>>,
    pub draft_document: Option<String>,
    pub reviewed_document: Option<String>,
    pub final_document: Option<String>,

    pub document_id: Option<String>,
    pub workflow_id: String,
    pub workflow_status: WorkflowPhase,
    pub error_message: Option<String>,

    pub compliance_check: Option<ComplianceReport>,
    pub quality_score: f64,

    pub feedback: Vec<String>,
    pub iteration_count: u32,
    pub max_iterations: u32,

    pub agent_executions: Vec<AgentExecution>,
    pub messages: Vec<String>,
}

impl WorkflowState {
    #[must_use]
    pub fn new(
        workflow_id: impl Into<String>,
        request: &GenerationRequest,
        max_iterations: u32,
    ) -> Self {
        Self {
            doc_type: request.doc_type.clone(),
            summary: request.summary.clone(),
            requirements: request.requirements.clone(),
            style: request.style.clone(),
            style_profile: None,
            retrieved_context: None,
            draft_document: None,
            reviewed_document: None,
            final_document: None,
            document_id: None,
            workflow_id: workflow_id.into(),
            workflow_status: WorkflowPhase::Initializing,
            error_message: None,
            compliance_check: None,
            quality_score: INITIAL_QUALITY_SCORE,
            feedback: request.feedback.clone(),
            iteration_count: 0,
            max_iterations,
            agent_executions: Vec::new(),
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: WorkflowPhase) -> Self {
        self.workflow_status = status;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    #[must_use]
    pub fn with_execution(
        mut self,
        agent: &str,
        status: &str,
        details: serde_json::Value,
    ) -> Self {
        self.agent_executions.push(AgentExecution {
            agent: agent.to_string(),
            status: status.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            details,
        });
        self
    }

    /// Record a node failure; routing will divert to the error terminal.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self.workflow_status = WorkflowPhase::Error;
        self
    }

    #[must_use]
    pub fn errored(&self) -> bool {
        self.error_message.is_some()
    }

    /// Apply the post-review quality update: monotonically non-decreasing,
    /// clamped to 1.0.
    #[must_use]
    pub fn with_quality_gain(mut self, changes_made: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let gain = QUALITY_PER_CHANGE * changes_made as f64;
        self.quality_score = (self.quality_score + gain).min(1.0);
        self
    }
}
