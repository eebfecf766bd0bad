//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                run_id,
                requirement,
            } => {
                info!(run_id = %run_id, requirement = %requirement, "Starting run");
            }
            ProgressEvent::RouterDecision {
                from,
                to,
                advance,
                reason,
            } => {
                if *advance {
                    info!(from = %from, to = %to, "Advancing to next stage");
                } else {
                    info!(
                        from = %from,
                        to = %to,
                        reason = reason.as_deref().unwrap_or("declined"),
                        "Staying in current stage"
                    );
                }
            }
            ProgressEvent::StageStarted { stage } => {
                info!(stage = %stage, "Starting stage");
            }
            ProgressEvent::StageCompleted { stage, duration } => {
                info!(
                    stage = %stage,
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::LoopTurn { turn } => {
                debug!(turn, "Starting conversational turn");
            }
            ProgressEvent::RecoveryFinished {
                stage,
                absolute_attempts,
                fragment_attempts,
                complete,
            } => {
                if *complete {
                    debug!(
                        stage = %stage,
                        absolute_attempts,
                        fragment_attempts,
                        "Candidate complete"
                    );
                } else {
                    warn!(
                        stage = %stage,
                        absolute_attempts,
                        fragment_attempts,
                        "Candidate still incomplete after recovery"
                    );
                }
            }
            ProgressEvent::CheckCompleted {
                turn,
                is_valid,
                failed_aspects,
            } => {
                if *is_valid {
                    info!(turn, "Check passed");
                } else {
                    info!(turn, failed_aspects, "Check failed");
                }
            }
            ProgressEvent::RevisionFallback { turn, reason } => {
                warn!(turn, reason = %reason, "Revision fell back to previous code");
            }
            ProgressEvent::ArtifactsWritten { output_dir, files } => {
                info!(output_dir = %output_dir, files, "Artifacts written");
            }
            ProgressEvent::Completed {
                is_valid,
                conversation_turn,
                total_time,
            } => {
                info!(
                    is_valid,
                    conversation_turn,
                    total_time_ms = total_time.as_millis(),
                    "Run complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Run failed");
            }
        }
    }
}
