use crate::extract::extract_as;
use crate::llm::ChatMessage;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::prompts::{render, CHECK_PROMPT, SERVER_SKELETON};
use crate::pipeline::state::{Attempt, CandidateArtifact, CheckResult};
use serde_json::json;
use tracing::{debug, warn};

const INVALID_CODE_ISSUE: &str = "Code is empty or invalid";
const CHECK_ERROR_ISSUE: &str = "Error during code checking";

/// Messages replayed to the checker: the requirement and code, then every
/// earlier verdict as the model's turn and every revision as the user's
pub fn check_history(brief: &str, code: &str, attempts: &[Attempt]) -> Vec<ChatMessage> {
    let mut history = vec![ChatMessage::user(
        json!({ "requirement": brief, "code": code }).to_string(),
    )];
    for attempt in attempts {
        history.push(ChatMessage::assistant(attempt.check.to_json()));
        if let Some(revision) = &attempt.revision {
            history.push(ChatMessage::user(revision.transcript.clone()));
        }
    }
    history
}

/// Validates `candidate` against the four checklist aspects
///
/// Placeholder candidates are rejected without a model call; failed calls and
/// unparseable verdicts degrade to an all-failed result.
pub async fn check(
    context: &PipelineContext,
    brief: &str,
    candidate: &CandidateArtifact,
    attempts: &[Attempt],
) -> CheckResult {
    if candidate.is_placeholder() {
        warn!("Invalid or empty code, skipping check");
        return CheckResult::all_failed(INVALID_CODE_ISSUE, INVALID_CODE_ISSUE);
    }

    let mut messages = vec![ChatMessage::system(render(
        CHECK_PROMPT,
        &[("skeleton", SERVER_SKELETON)],
    ))];
    messages.extend(check_history(brief, &candidate.source_text, attempts));

    let text = match context.complete(messages).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Check call failed");
            return check_error(e);
        }
    };

    match extract_as::<CheckResult>(&text, "checklist") {
        Ok(result) => {
            debug!(
                is_valid = result.is_valid,
                failed_aspects = result.aspects.failed_count(),
                "Check verdict"
            );
            result
        }
        Err(e) => {
            warn!(error = %e, "Check verdict could not be parsed");
            check_error(e)
        }
    }
}

fn check_error(error: impl std::fmt::Display) -> CheckResult {
    CheckResult::all_failed(CHECK_ERROR_ISSUE, format!("{}: {}", CHECK_ERROR_ISSUE, error))
}
