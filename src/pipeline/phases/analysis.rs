//! Requirement analysis: decompose, refine, finalize

use crate::extract::extract_as;
use crate::llm::ChatMessage;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::prompts::{
    ANALYSIS_DECOMPOSE_PROMPT, ANALYSIS_FINALIZE_PROMPT, ANALYSIS_REFINE_PROMPT,
};
use crate::pipeline::stage::Stage;
use crate::pipeline::state::{DescriptorPayload, PipelineState, RequirementDescriptor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub struct AnalysisPhase;

/// Turns a free-form requirement into a descriptor
///
/// Call failures (after retries) propagate. A final answer that does not
/// parse as a descriptor yields an `other` descriptor instead.
pub async fn analyse(context: &PipelineContext, requirement: &str) -> Result<RequirementDescriptor> {
    let mut dialogue = vec![ChatMessage::user(requirement)];

    let decomposition = context
        .complete(prepend_system(ANALYSIS_DECOMPOSE_PROMPT, &dialogue))
        .await
        .context("Requirement decomposition failed")?;
    debug!(chars = decomposition.len(), "Decomposed requirement");
    dialogue.push(ChatMessage::assistant(decomposition));

    let refinement = context
        .complete(append_system(&dialogue, ANALYSIS_REFINE_PROMPT))
        .await
        .context("Requirement refinement failed")?;
    debug!(chars = refinement.len(), "Refined requirement");
    dialogue.push(ChatMessage::assistant(refinement));

    let answer = context
        .complete(append_system(&dialogue, ANALYSIS_FINALIZE_PROMPT))
        .await
        .context("Requirement finalization failed")?;

    let descriptor = match extract_as::<DescriptorPayload>(&answer, "requirement descriptor") {
        Ok(payload) => RequirementDescriptor::from_payload(payload, requirement),
        Err(e) => {
            warn!(error = %e, "Analysis result is not a descriptor, treating requirement as unrelated");
            RequirementDescriptor::unrelated(requirement)
        }
    };
    Ok(descriptor)
}

fn prepend_system(prompt: &str, dialogue: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(dialogue.len() + 1);
    messages.push(ChatMessage::system(prompt));
    messages.extend(dialogue.iter().cloned());
    messages
}

fn append_system(dialogue: &[ChatMessage], prompt: &str) -> Vec<ChatMessage> {
    let mut messages = dialogue.to_vec();
    messages.push(ChatMessage::system(prompt));
    messages
}

#[async_trait]
impl WorkflowPhase for AnalysisPhase {
    fn stage(&self) -> Stage {
        Stage::Analyse
    }

    async fn execute(&self, context: &PipelineContext, state: &mut PipelineState) -> Result<()> {
        let descriptor = analyse(context, &state.requirement).await?;

        info!(
            category = descriptor.category().as_str(),
            steps = descriptor.steps().map(|s| s.len()).unwrap_or(0),
            "Requirement analysed"
        );

        let payload = serde_json::to_string(&descriptor.to_payload())
            .context("Failed to serialize requirement descriptor")?;
        state.push_message(ChatMessage::assistant(payload));
        state.descriptor = Some(descriptor);
        Ok(())
    }
}
