//! Step router
//!
//! Asks the model a yes/no question about handing control to the next
//! configured stage, then applies data guards. Only an exact `true` advances;
//! the router never raises.

use super::context::PipelineContext;
use super::prompts::{render, ROUTER_PROMPT};
use super::stage::{next_stage, Stage, StageSpec};
use super::state::PipelineState;
use crate::llm::ChatMessage;
use tracing::{debug, warn};

/// Why the router kept the current stage
#[derive(Debug, Clone, PartialEq)]
pub enum StayReason {
    /// The model answered `false`
    Declined,
    /// The model answered something other than `true` or `false`
    UnrecognizedAnswer(String),
    /// The next stage's input is not available yet
    GuardBlocked(Stage),
    /// The call failed; a diagnostic was appended to the message log
    CallFailed(String),
    /// The current stage is last in the list
    NoNextStage,
}

impl std::fmt::Display for StayReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StayReason::Declined => write!(f, "router declined"),
            StayReason::UnrecognizedAnswer(answer) => {
                write!(f, "unrecognized router answer: {:?}", answer)
            }
            StayReason::GuardBlocked(stage) => write!(f, "input for {} is not ready", stage),
            StayReason::CallFailed(error) => write!(f, "router call failed: {}", error),
            StayReason::NoNextStage => write!(f, "no stage after the current one"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    Advance(Stage),
    Stay(StayReason),
}

/// Normalized yes/no answer; `None` when it is neither
pub fn parse_answer(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Whether `state` carries what `stage` needs to run
pub fn guard_allows(stage: Stage, state: &PipelineState) -> bool {
    match stage {
        Stage::Generate => state.descriptor.is_some(),
        Stage::Compose => state.candidate_settled(),
        Stage::Start | Stage::Analyse | Stage::End => true,
    }
}

fn members(stages: &[StageSpec]) -> String {
    stages
        .iter()
        .map(|s| format!("- {}: {}", s.stage, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StepRouter;

impl StepRouter {
    pub fn new() -> Self {
        Self
    }

    /// Decides whether control moves past `state.current_stage`
    ///
    /// Entering the terminal stage needs no model call.
    pub async fn decide(&self, context: &PipelineContext, state: &mut PipelineState) -> RouteDecision {
        let stages = &context.config.stages;
        let current = state.current_stage;
        let Some(next) = next_stage(stages, current) else {
            return RouteDecision::Stay(StayReason::NoNextStage);
        };
        let next = next.stage;

        if next.is_terminal() {
            return RouteDecision::Advance(next);
        }

        let members = members(stages);
        let prompt = render(
            ROUTER_PROMPT,
            &[
                ("members", members.as_str()),
                ("current_step", current.name()),
                ("next_step", next.name()),
            ],
        );
        let mut messages = vec![ChatMessage::system(prompt)];
        if let Some(latest) = state.latest_message() {
            messages.push(latest.clone());
        }

        let answer = match context.complete(messages).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(from = %current, to = %next, error = %e, "Router call failed");
                state.push_message(ChatMessage::assistant(format!(
                    "Error routing from {} to {}: {}",
                    current, next, e
                )));
                return RouteDecision::Stay(StayReason::CallFailed(e.to_string()));
            }
        };

        match parse_answer(&answer) {
            Some(true) if guard_allows(next, state) => {
                debug!(from = %current, to = %next, "Router advanced");
                RouteDecision::Advance(next)
            }
            Some(true) => {
                debug!(to = %next, "Guard blocked transition");
                RouteDecision::Stay(StayReason::GuardBlocked(next))
            }
            Some(false) => RouteDecision::Stay(StayReason::Declined),
            None => {
                warn!(answer = %answer, "Router answer is neither true nor false, staying");
                RouteDecision::Stay(StayReason::UnrecognizedAnswer(answer))
            }
        }
    }
}
