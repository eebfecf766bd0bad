//! Generation, validation and repair loop
//!
//! GENERATE once, then CHECK; while the verdict is invalid and turns remain,
//! REVISE and CHECK again. Each REVISE is one conversational turn.

use super::check::check;
use super::generate::generate;
use super::revise::revise;
use crate::llm::ChatMessage;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::stage::Stage;
use crate::pipeline::state::{Attempt, CandidateArtifact, PipelineState, RevisionOutcome};
use crate::progress::ProgressEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

pub struct GenerationPhase;

#[async_trait]
impl WorkflowPhase for GenerationPhase {
    fn stage(&self) -> Stage {
        Stage::Generate
    }

    async fn execute(&self, context: &PipelineContext, state: &mut PipelineState) -> Result<()> {
        let descriptor = state
            .descriptor
            .clone()
            .context("Generation requires a requirement descriptor")?;
        let brief = serde_json::to_string(&descriptor.to_payload())
            .context("Failed to serialize requirement descriptor")?;
        let max_turns = context.config.max_turns;

        state.attempts.clear();
        state.conversation_turn = 0;
        state.is_valid = false;
        state.loop_exhausted = false;

        context.report(ProgressEvent::LoopTurn { turn: 0 });
        let generation = generate(context, &descriptor).await;
        context.report(ProgressEvent::RecoveryFinished {
            stage: "generate".to_string(),
            absolute_attempts: generation.recovery.absolute_attempts,
            fragment_attempts: generation.recovery.fragment_attempts,
            complete: generation.recovery.is_complete(),
        });
        let mut candidate = generation.candidate;

        loop {
            let verdict = check(context, &brief, &candidate, &state.attempts).await;
            context.report(ProgressEvent::CheckCompleted {
                turn: state.conversation_turn,
                is_valid: verdict.is_valid,
                failed_aspects: verdict.aspects.failed_count(),
            });
            state.is_valid = verdict.is_valid;
            state.attempts.push(Attempt {
                check: verdict,
                revision: None,
            });

            if state.is_valid || state.conversation_turn >= max_turns {
                break;
            }

            let revision = revise(context, &brief, &candidate, &state.attempts).await;
            state.conversation_turn += 1;
            context.report(ProgressEvent::LoopTurn {
                turn: state.conversation_turn,
            });
            if let RevisionOutcome::Fallback { reason } = &revision.outcome {
                context.report(ProgressEvent::RevisionFallback {
                    turn: state.conversation_turn,
                    reason: reason.clone(),
                });
            }

            candidate =
                CandidateArtifact::new(revision.improved_code.clone(), state.conversation_turn);
            if let Some(last) = state.attempts.last_mut() {
                last.revision = Some(revision);
            }
        }

        state.candidate = Some(candidate);
        state.loop_exhausted = !state.is_valid;
        info!(
            is_valid = state.is_valid,
            turns = state.conversation_turn,
            attempts = state.attempts.len(),
            "Generation loop finished"
        );

        let summary = serde_json::to_string(&state.summary())
            .context("Failed to serialize run summary")?;
        state.push_message(ChatMessage::assistant(summary));
        Ok(())
    }
}
