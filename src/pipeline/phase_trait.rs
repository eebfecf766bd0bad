use super::context::PipelineContext;
use super::stage::Stage;
use super::state::PipelineState;
use anyhow::Result;
use async_trait::async_trait;

/// Work performed when the router hands control to a stage
#[async_trait]
pub trait WorkflowPhase: Send + Sync {
    fn stage(&self) -> Stage;

    async fn execute(&self, context: &PipelineContext, state: &mut PipelineState) -> Result<()>;
}
