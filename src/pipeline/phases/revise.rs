use super::recovery::{
    is_sentinel, recover, Fragment, FragmentSource, RecoveryBudget, RecoveryEnd,
};
use crate::extract::{extract, Extraction, StructuralMarkers};
use crate::llm::ChatMessage;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::prompts::{render, REVISE_CONTINUATION_PROMPT, REVISE_PROMPT, SERVER_SKELETON};
use crate::pipeline::state::{
    Attempt, CandidateArtifact, RevisionOutcome, RevisionResult, ERROR_PREFIX,
    REVISION_FAILED_PLACEHOLDER,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

const MISSING_IMPROVED_CODE: &str = "improvedCode field is missing or empty after multiple attempts";

#[derive(Deserialize)]
#[serde(untagged)]
enum ChangeSummary {
    List(Vec<String>),
    Text(String),
}

fn change_summary(payload: &Map<String, Value>) -> Vec<String> {
    let Some(raw) = payload.get("changeSummary") else {
        return Vec::new();
    };
    match serde_json::from_value::<ChangeSummary>(raw.clone()) {
        Ok(ChangeSummary::List(items)) => items,
        Ok(ChangeSummary::Text(text)) if !text.trim().is_empty() => vec![text],
        _ => Vec::new(),
    }
}

/// Messages replayed to the reviser: the requirement and the code under
/// revision, then every verdict as the user's turn and every revision as the
/// model's
pub fn revise_history(brief: &str, code: &str, attempts: &[Attempt]) -> Vec<ChatMessage> {
    let mut history = vec![ChatMessage::user(brief), ChatMessage::assistant(code)];
    for attempt in attempts {
        history.push(ChatMessage::user(attempt.check.to_json()));
        if let Some(revision) = &attempt.revision {
            history.push(ChatMessage::assistant(revision.transcript.clone()));
        }
    }
    history
}

struct RevisionSource<'a> {
    context: &'a PipelineContext,
    system_prompt: String,
    history: Vec<ChatMessage>,
    /// Last payload that carried a usable `improvedCode`
    payload: Option<Map<String, Value>>,
}

#[async_trait]
impl FragmentSource for RevisionSource<'_> {
    async fn next_fragment(&mut self, partial: Option<&str>) -> Fragment {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(self.history.iter().cloned());
        if let Some(partial) = partial {
            messages.push(ChatMessage::user(render(
                REVISE_CONTINUATION_PROMPT,
                &[("partial", partial)],
            )));
        }

        let text = match self.context.complete(messages).await {
            Ok(text) => text,
            Err(e) => return Fragment::Abort(e.to_string()),
        };
        if is_sentinel(&text) {
            return Fragment::Sentinel;
        }

        let payload = match extract(&text) {
            Extraction::Parsed {
                value: Value::Object(map),
                ..
            } => map,
            Extraction::Parsed { .. } => {
                return Fragment::Unusable("revision payload is not an object".to_string())
            }
            Extraction::Failed { error, .. } => return Fragment::Unusable(error.to_string()),
        };

        match payload.get("improvedCode").and_then(Value::as_str) {
            Some(code) if !code.trim().is_empty() => {
                let code = code.to_string();
                self.payload = Some(payload);
                Fragment::Text(code)
            }
            _ => Fragment::Unusable("improvedCode field is missing or empty".to_string()),
        }
    }
}

/// Previous candidate kept when revision produced nothing usable
pub fn fallback(previous_code: &str, reason: &str) -> RevisionResult {
    let code = if previous_code.starts_with(ERROR_PREFIX) {
        REVISION_FAILED_PLACEHOLDER.to_string()
    } else {
        previous_code.to_string()
    };
    let transcript = json!({
        "error": format!("Failed during code revision: {}", reason),
        "improvedCode": code,
    })
    .to_string();

    RevisionResult {
        improved_code: code,
        change_summary: Vec::new(),
        outcome: RevisionOutcome::Fallback {
            reason: reason.to_string(),
        },
        transcript,
    }
}

/// Asks for an improved candidate given every earlier attempt
///
/// `attempts` ends with the verdict on `current`. Never fails: a failed call
/// or a missing `improvedCode` returns [`fallback`].
pub async fn revise(
    context: &PipelineContext,
    brief: &str,
    current: &CandidateArtifact,
    attempts: &[Attempt],
) -> RevisionResult {
    let mut source = RevisionSource {
        context,
        system_prompt: render(REVISE_PROMPT, &[("skeleton", SERVER_SKELETON)]),
        history: revise_history(brief, &current.source_text, attempts),
        payload: None,
    };

    let recovery = recover(
        &mut source,
        RecoveryBudget::from_config(&context.config),
        StructuralMarkers::BRACES,
    )
    .await;

    let improved = match (recovery.end, recovery.text) {
        (RecoveryEnd::Aborted(reason), _) => {
            warn!(reason = %reason, "Revision call failed, keeping previous code");
            return fallback(&current.source_text, &reason);
        }
        (_, Some(text)) => text,
        (_, None) => {
            let reason = recovery
                .last_issue
                .map(|issue| format!("{} ({})", MISSING_IMPROVED_CODE, issue))
                .unwrap_or_else(|| MISSING_IMPROVED_CODE.to_string());
            warn!(reason = %reason, "No usable revision, keeping previous code");
            return fallback(&current.source_text, &reason);
        }
    };

    let mut payload = source.payload.unwrap_or_default();
    let change_summary = change_summary(&payload);
    payload.insert("improvedCode".to_string(), Value::String(improved.clone()));
    debug!(
        changes = change_summary.len(),
        chars = improved.len(),
        "Revised candidate"
    );

    RevisionResult {
        improved_code: improved,
        change_summary,
        outcome: RevisionOutcome::Revised,
        transcript: Value::Object(payload).to_string(),
    }
}
