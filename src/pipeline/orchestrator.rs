use super::context::PipelineContext;
use super::phase_trait::WorkflowPhase;
use super::phases::{AnalysisPhase, ComposePhase, GenerationPhase};
use super::router::{RouteDecision, StayReason, StepRouter};
use super::stage::Stage;
use super::state::{ComposedArtifacts, PipelineState, RequirementDescriptor, RunSummary};
use crate::llm::ChatMessage;
use crate::progress::ProgressEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// The terminal stage was reached
    Completed,
    /// The router kept a non-terminal stage
    Stayed { stage: Stage, reason: String },
    /// A stage raised an error
    Failed { stage: Stage, error: String },
    /// The router iteration cap was hit
    IterationCapReached { iterations: usize },
}

/// Everything a caller gets back from a run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    #[serde(flatten)]
    pub status: RunStatus,
    pub final_stage: Stage,
    pub descriptor: Option<RequirementDescriptor>,
    pub summary: RunSummary,
    pub artifacts: Option<ComposedArtifacts>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn is_valid(&self) -> bool {
        self.summary.is_valid
    }
}

pub struct PipelineOrchestrator {
    context: PipelineContext,
    router: StepRouter,
}

impl PipelineOrchestrator {
    pub fn new(context: PipelineContext) -> Self {
        Self {
            context,
            router: StepRouter::new(),
        }
    }

    /// Runs from the start stage with a free-form requirement
    pub async fn run(&self, requirement: &str) -> RunOutcome {
        self.execute(PipelineState::new(requirement)).await
    }

    /// Runs from generation with a ready descriptor
    pub async fn run_from_descriptor(&self, descriptor: RequirementDescriptor) -> RunOutcome {
        self.execute(PipelineState::from_descriptor(descriptor)).await
    }

    fn phase_for(stage: Stage) -> Option<Box<dyn WorkflowPhase>> {
        match stage {
            Stage::Analyse => Some(Box::new(AnalysisPhase)),
            Stage::Generate => Some(Box::new(GenerationPhase)),
            Stage::Compose => Some(Box::new(ComposePhase)),
            Stage::Start | Stage::End => None,
        }
    }

    /// Drives `state` through the configured stages until the terminal
    /// stage, a stay, a stage error or the iteration cap
    pub async fn execute(&self, mut state: PipelineState) -> RunOutcome {
        let start = Instant::now();
        let started_at = Utc::now();
        let max_iterations = self.context.config.max_router_iterations;
        info!(run_id = %state.run_id, stage = %state.current_stage, "Starting pipeline");
        self.context.report(ProgressEvent::Started {
            run_id: state.run_id.clone(),
            requirement: state.requirement.clone(),
        });

        let mut iterations = 0;
        let status = loop {
            if state.current_stage.is_terminal() {
                break RunStatus::Completed;
            }
            if iterations >= max_iterations {
                warn!(iterations, "Router iteration cap reached");
                break RunStatus::IterationCapReached { iterations };
            }
            iterations += 1;

            let from = state.current_stage;
            let decision = self.router.decide(&self.context, &mut state).await;
            let to = match &decision {
                RouteDecision::Advance(stage) => *stage,
                RouteDecision::Stay(StayReason::GuardBlocked(stage)) => *stage,
                RouteDecision::Stay(_) => from,
            };
            self.context.report(ProgressEvent::RouterDecision {
                from: from.to_string(),
                to: to.to_string(),
                advance: matches!(decision, RouteDecision::Advance(_)),
                reason: match &decision {
                    RouteDecision::Stay(reason) => Some(reason.to_string()),
                    RouteDecision::Advance(_) => None,
                },
            });

            let next = match decision {
                RouteDecision::Advance(stage) => stage,
                RouteDecision::Stay(reason) => {
                    info!(stage = %from, reason = %reason, "Staying in current stage");
                    break RunStatus::Stayed {
                        stage: from,
                        reason: reason.to_string(),
                    };
                }
            };
            state.current_stage = next;

            let Some(phase) = Self::phase_for(next) else {
                debug!(stage = %next, "Stage has no work");
                continue;
            };

            let stage = phase.stage();
            self.context.report(ProgressEvent::StageStarted {
                stage: stage.to_string(),
            });
            let phase_start = Instant::now();
            if let Err(e) = phase.execute(&self.context, &mut state).await {
                let error = format!("{:#}", e);
                warn!(stage = %stage, error = %error, "Stage failed");
                state.push_message(ChatMessage::assistant(format!(
                    "Error in {} stage: {}",
                    stage, error
                )));
                self.context.report(ProgressEvent::Failed {
                    error: error.clone(),
                });
                break RunStatus::Failed { stage, error };
            }
            self.context.report(ProgressEvent::StageCompleted {
                stage: stage.to_string(),
                duration: phase_start.elapsed(),
            });
        };

        let summary = state.summary();
        info!(
            run_id = %state.run_id,
            status = ?status,
            is_valid = summary.is_valid,
            iterations,
            "Pipeline finished"
        );
        if !matches!(status, RunStatus::Failed { .. }) {
            self.context.report(ProgressEvent::Completed {
                is_valid: summary.is_valid,
                conversation_turn: summary.conversation_turn,
                total_time: start.elapsed(),
            });
        }

        RunOutcome {
            run_id: state.run_id.clone(),
            status,
            final_stage: state.current_stage,
            descriptor: state.descriptor.clone(),
            summary,
            artifacts: state.artifacts.take(),
            started_at,
            finished_at: Utc::now(),
        }
    }
}
