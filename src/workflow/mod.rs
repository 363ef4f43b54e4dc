mod engine;
mod state;

pub use engine::{
    ComplianceRoute, ReviewRoute, WorkflowEngine, WorkflowReport, compliance_gated_route,
};
pub use state::{
    AgentExecution, GenerationRequest, INITIAL_QUALITY_SCORE, QUALITY_PER_CHANGE, WorkflowPhase,
    WorkflowState,
};
