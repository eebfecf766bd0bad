//! Data carried through a pipeline run

use super::stage::Stage;
use crate::extract::StructuralMarkers;
use crate::llm::ChatMessage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source text written when generation produced nothing usable
pub const GENERATION_FAILED_PLACEHOLDER: &str =
    "// Error: Could not generate complete code after multiple attempts";

/// Source text kept when revision falls back on a candidate that was already an error
pub const REVISION_FAILED_PLACEHOLDER: &str =
    "// Error: Could not generate code properly. Please check the requirements and try again.";

/// Prefix marking a candidate as a failure placeholder
pub const ERROR_PREFIX: &str = "// Error:";

/// Response meaning the model considers the conversation over
pub const CONVERSATION_END_SENTINEL: &str = "<<HUMAN_CONVERSATION_END>>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementCategory {
    Database,
    Browser,
    Other,
}

impl RequirementCategory {
    /// Unknown labels map to `Other`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "database" => RequirementCategory::Database,
            "browser" => RequirementCategory::Browser,
            _ => RequirementCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementCategory::Database => "database",
            RequirementCategory::Browser => "browser",
            RequirementCategory::Other => "other",
        }
    }
}

/// Wire shape of a descriptor as the model emits it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorPayload {
    pub requirement_type: String,
    #[serde(default)]
    pub operation_details: Option<Vec<String>>,
    #[serde(default, alias = "requirement", skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
}

/// Structured classification and step breakdown of a requirement
///
/// `steps` is `None` exactly when the category is `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementDescriptor {
    category: RequirementCategory,
    steps: Option<Vec<String>>,
    original_text: String,
}

impl RequirementDescriptor {
    pub fn new(
        category: RequirementCategory,
        steps: Option<Vec<String>>,
        original_text: impl Into<String>,
    ) -> Self {
        let steps = match category {
            RequirementCategory::Other => None,
            _ => Some(steps.unwrap_or_default()),
        };
        Self {
            category,
            steps,
            original_text: original_text.into(),
        }
    }

    /// Descriptor for a requirement outside the supported domain
    pub fn unrelated(original_text: impl Into<String>) -> Self {
        Self::new(RequirementCategory::Other, None, original_text)
    }

    /// Builds a descriptor from the model's payload, keeping `fallback_text`
    /// when the payload does not carry the requirement itself
    pub fn from_payload(payload: DescriptorPayload, fallback_text: &str) -> Self {
        let original_text = payload
            .original_text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| fallback_text.to_string());
        Self::new(
            RequirementCategory::from_label(&payload.requirement_type),
            payload.operation_details,
            original_text,
        )
    }

    pub fn category(&self) -> RequirementCategory {
        self.category
    }

    pub fn steps(&self) -> Option<&[String]> {
        self.steps.as_deref()
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// Wire form handed to the generation templates
    pub fn to_payload(&self) -> DescriptorPayload {
        DescriptorPayload {
            requirement_type: self.category.as_str().to_string(),
            operation_details: self.steps.clone(),
            original_text: Some(self.original_text.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectResult {
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl AspectResult {
    pub fn failed(issue: impl Into<String>) -> Self {
        Self {
            passed: false,
            issues: vec![issue.into()],
        }
    }
}

/// The four fixed checklist aspects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckAspects {
    #[serde(rename = "baseProtocol")]
    pub protocol_framing: AspectResult,
    #[serde(rename = "serverSetup")]
    pub service_setup: AspectResult,
    #[serde(rename = "handlers")]
    pub request_handlers: AspectResult,
    #[serde(rename = "tools")]
    pub tool_declarations: AspectResult,
}

impl CheckAspects {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AspectResult)> {
        [
            ("baseProtocol", &self.protocol_framing),
            ("serverSetup", &self.service_setup),
            ("handlers", &self.request_handlers),
            ("tools", &self.tool_declarations),
        ]
        .into_iter()
    }

    pub fn failed_count(&self) -> usize {
        self.iter().filter(|(_, aspect)| !aspect.passed).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Verdict of one CHECK pass, serialized in the checklist wire schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    #[serde(rename = "checkResults")]
    pub aspects: CheckAspects,
    #[serde(default)]
    pub summary: CheckSummary,
}

impl CheckResult {
    /// Deterministic verdict with every aspect failed for the same reason
    pub fn all_failed(issue: &str, error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            aspects: CheckAspects {
                protocol_framing: AspectResult::failed(issue),
                service_setup: AspectResult::failed(issue),
                request_handlers: AspectResult::failed(issue),
                tool_declarations: AspectResult::failed(issue),
            },
            summary: CheckSummary {
                errors: vec![error.into()],
                warnings: vec!["Please check the requirements and try again".to_string()],
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Current best-guess source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateArtifact {
    pub source_text: String,
    pub complete: bool,
    /// Conversation turn that produced the candidate, 0 for GENERATE
    pub attempt_index: usize,
}

impl CandidateArtifact {
    pub fn new(source_text: impl Into<String>, attempt_index: usize) -> Self {
        let source_text = source_text.into();
        let complete = StructuralMarkers::BRACES.is_complete(&source_text);
        Self {
            source_text,
            complete,
            attempt_index,
        }
    }

    /// Empty, whitespace-only, sentinel or error-prefixed text
    pub fn is_placeholder(&self) -> bool {
        let trimmed = self.source_text.trim();
        trimmed.is_empty()
            || trimmed == CONVERSATION_END_SENTINEL
            || self.source_text.starts_with(ERROR_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RevisionOutcome {
    Revised,
    Fallback { reason: String },
}

/// What one REVISE pass produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionResult {
    pub improved_code: String,
    pub change_summary: Vec<String>,
    pub outcome: RevisionOutcome,
    /// Text of the model turn as it is replayed in later prompts
    pub transcript: String,
}

impl RevisionResult {
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, RevisionOutcome::Fallback { .. })
    }
}

/// A CHECK verdict and the revision that followed it, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub check: CheckResult,
    pub revision: Option<RevisionResult>,
}

/// Files written by the composition stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedArtifacts {
    pub output_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub summary: String,
}

/// Mutable state of one run
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub run_id: String,
    pub messages: Vec<ChatMessage>,
    pub current_stage: Stage,
    pub conversation_turn: usize,
    pub requirement: String,
    pub descriptor: Option<RequirementDescriptor>,
    pub candidate: Option<CandidateArtifact>,
    pub attempts: Vec<Attempt>,
    pub is_valid: bool,
    pub loop_exhausted: bool,
    pub artifacts: Option<ComposedArtifacts>,
}

impl PipelineState {
    /// State for a run entering at analysis
    pub fn new(requirement: impl Into<String>) -> Self {
        let requirement = requirement.into();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            messages: vec![ChatMessage::user(requirement.clone())],
            current_stage: Stage::Start,
            conversation_turn: 0,
            requirement,
            descriptor: None,
            candidate: None,
            attempts: Vec::new(),
            is_valid: false,
            loop_exhausted: false,
            artifacts: None,
        }
    }

    /// State for a run entering at generation with a ready descriptor
    pub fn from_descriptor(descriptor: RequirementDescriptor) -> Self {
        let payload = serde_json::to_string(&descriptor.to_payload()).unwrap_or_default();
        let mut state = Self::new(descriptor.original_text().to_string());
        state.messages = vec![ChatMessage::user(payload)];
        state.current_stage = Stage::Analyse;
        state.descriptor = Some(descriptor);
        state
    }

    pub fn code(&self) -> &str {
        self.candidate
            .as_ref()
            .map(|c| c.source_text.as_str())
            .unwrap_or("")
    }

    /// Candidate is ready for composition
    pub fn candidate_settled(&self) -> bool {
        self.candidate.is_some() && (self.is_valid || self.loop_exhausted)
    }

    pub fn latest_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Serialized check verdicts in order
    pub fn check_history(&self) -> Vec<String> {
        self.attempts.iter().map(|a| a.check.to_json()).collect()
    }

    /// Revision transcripts in order
    pub fn revise_history(&self) -> Vec<String> {
        self.attempts
            .iter()
            .filter_map(|a| a.revision.as_ref().map(|r| r.transcript.clone()))
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            requirement: self.requirement.clone(),
            code: self.code().to_string(),
            is_valid: self.is_valid,
            conversation_turn: self.conversation_turn,
            check_history: self.check_history(),
            revise_history: self.revise_history(),
        }
    }
}

/// Terminal summary of the generation loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub requirement: String,
    pub code: String,
    pub is_valid: bool,
    pub conversation_turn: usize,
    pub check_history: Vec<String>,
    pub revise_history: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_other_category_never_has_steps() {
        let descriptor = RequirementDescriptor::new(
            RequirementCategory::Other,
            Some(vec!["ignored".to_string()]),
            "tell me a joke",
        );
        assert!(descriptor.steps().is_none());
    }

    #[test]
    fn test_supported_category_always_has_steps() {
        let descriptor = RequirementDescriptor::new(RequirementCategory::Browser, None, "open page");
        assert_eq!(descriptor.steps(), Some(&[][..]));
    }

    #[test]
    fn test_descriptor_from_payload() {
        let payload: DescriptorPayload = serde_json::from_value(json!({
            "requirement_type": "Database",
            "operation_details": ["Query the log table", "Group by hour"]
        }))
        .unwrap();

        let descriptor = RequirementDescriptor::from_payload(payload, "organize logs");

        assert_eq!(descriptor.category(), RequirementCategory::Database);
        assert_eq!(descriptor.steps().unwrap().len(), 2);
        assert_eq!(descriptor.original_text(), "organize logs");
    }

    #[test]
    fn test_unknown_category_is_other() {
        assert_eq!(
            RequirementCategory::from_label("filesystem"),
            RequirementCategory::Other
        );
    }

    #[test]
    fn test_check_result_wire_names() {
        let check = CheckResult::all_failed("Code is empty or invalid", "Code is empty or invalid");
        let value = serde_json::to_value(&check).unwrap();

        assert_eq!(value["isValid"], false);
        for aspect in ["baseProtocol", "serverSetup", "handlers", "tools"] {
            assert_eq!(value["checkResults"][aspect]["passed"], false);
        }
        assert_eq!(check.aspects.failed_count(), 4);
    }

    #[test]
    fn test_candidate_completeness_and_placeholders() {
        assert!(CandidateArtifact::new("main() {\n}", 0).complete);
        assert!(!CandidateArtifact::new("main() {", 0).complete);
        assert!(CandidateArtifact::new("   ", 0).is_placeholder());
        assert!(CandidateArtifact::new(GENERATION_FAILED_PLACEHOLDER, 0).is_placeholder());
        assert!(CandidateArtifact::new(CONVERSATION_END_SENTINEL, 0).is_placeholder());
        assert!(!CandidateArtifact::new("const a = 1;", 0).is_placeholder());
    }

    #[test]
    fn test_histories_follow_attempts() {
        let mut state = PipelineState::new("req");
        state.attempts.push(Attempt {
            check: CheckResult::all_failed("x", "x"),
            revision: Some(RevisionResult {
                improved_code: "code".to_string(),
                change_summary: vec![],
                outcome: RevisionOutcome::Revised,
                transcript: "{\"improvedCode\":\"code\"}".to_string(),
            }),
        });
        state.attempts.push(Attempt {
            check: CheckResult::all_failed("y", "y"),
            revision: None,
        });

        let summary = state.summary();
        assert_eq!(summary.check_history.len(), 2);
        assert_eq!(summary.revise_history.len(), 1);
        assert!(!summary.is_valid);
    }

    #[test]
    fn test_state_from_descriptor_starts_after_analysis() {
        let descriptor = RequirementDescriptor::new(
            RequirementCategory::Database,
            Some(vec!["step".to_string()]),
            "insert a student",
        );
        let state = PipelineState::from_descriptor(descriptor);

        assert_eq!(state.current_stage, Stage::Analyse);
        assert_eq!(state.requirement, "insert a student");
        assert!(state.descriptor.is_some());
        assert!(state.messages[0].content.contains("\"requirement_type\":\"database\""));
    }
}
