pub mod config;
pub mod context;
pub mod orchestrator;
pub mod phase_trait;
pub mod phases;
pub mod prompts;
pub mod router;
pub mod stage;
pub mod state;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use orchestrator::{PipelineOrchestrator, RunOutcome, RunStatus};
pub use phase_trait::WorkflowPhase;
pub use router::{RouteDecision, StayReason, StepRouter};
pub use stage::{Stage, StageSpec};
pub use state::{
    Attempt, CandidateArtifact, CheckResult, ComposedArtifacts, DescriptorPayload, PipelineState,
    RequirementCategory, RequirementDescriptor, RevisionOutcome, RevisionResult, RunSummary,
};
