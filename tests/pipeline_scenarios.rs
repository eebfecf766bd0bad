//! End-to-end pipeline runs against a scripted model
//!
//! Every test scripts the exact sequence of model answers, so the call
//! counts asserted here pin down how many requests each stage makes.

mod support;

use mcpsmith::llm::{MockLLMClient, MockResponse, MessageRole};
use mcpsmith::pipeline::state::CONVERSATION_END_SENTINEL;
use mcpsmith::pipeline::{
    RequirementCategory, RequirementDescriptor, RunStatus, Stage,
};
use mcpsmith::progress::ProgressEvent;
use serde_json::json;
use std::sync::Arc;
use support::*;
use tempfile::TempDir;

const REQUIREMENT: &str = "organize the database log table";

#[tokio::test]
async fn test_failed_check_is_repaired_on_next_turn() {
    let temp = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(router_yes());
    mock.add_responses(database_analysis(REQUIREMENT));
    mock.add_response(router_yes());
    mock.add_response(MockResponse::text(format!("```typescript\n{}```", SERVER_WITHOUT_TOOLS)));
    mock.add_response(verdict(false, &["No tool declarations found"]));
    mock.add_response(MockResponse::json(json!({
        "improvedCode": VALID_SERVER,
        "changes": ["Declared the organize_logs tool"]
    })));
    mock.add_response(verdict(true, &[]));
    mock.add_response(router_yes());
    mock.add_responses(composition());

    let (orchestrator, recorder) = orchestrator(mock.clone(), test_config(temp.path()));
    let outcome = orchestrator.run(REQUIREMENT).await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.final_stage, Stage::End);
    assert!(outcome.is_valid());

    let descriptor = outcome.descriptor.as_ref().unwrap();
    assert_eq!(descriptor.category(), RequirementCategory::Database);
    assert_eq!(descriptor.steps().map(|s| s.len()), Some(3));

    let summary = &outcome.summary;
    assert_eq!(summary.requirement, REQUIREMENT);
    assert_eq!(summary.conversation_turn, 1);
    assert_eq!(summary.check_history.len(), 2);
    assert_eq!(summary.revise_history.len(), 1);
    assert_eq!(summary.code.trim(), VALID_SERVER.trim());

    let checks: Vec<bool> = recorder
        .events()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::CheckCompleted { is_valid, .. } => Some(*is_valid),
            _ => None,
        })
        .collect();
    assert_eq!(checks, vec![false, true]);

    // The second CHECK sees the first verdict and the revision
    let requests = mock.requests();
    let second_check = &requests[8];
    let roles: Vec<MessageRole> = second_check.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User
        ]
    );
    assert!(second_check.messages[2].content.contains("No tool declarations found"));

    let artifacts = outcome.artifacts.as_ref().unwrap();
    assert_eq!(artifacts.files.len(), 4);
    assert_eq!(artifacts.output_dir, temp.path().join(&outcome.run_id));
    let source = std::fs::read_to_string(artifacts.output_dir.join("index.ts")).unwrap();
    assert_eq!(source.trim(), VALID_SERVER.trim());
    let manifest = std::fs::read_to_string(artifacts.output_dir.join("package.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(manifest["name"], "db-logs");

    assert_eq!(mock.call_count(), 13);
    assert_eq!(mock.remaining_responses(), 0);
}

#[tokio::test]
async fn test_sentinels_only_consume_absolute_attempts() {
    let temp = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(router_yes());
    mock.add_responses(database_analysis(REQUIREMENT));
    mock.add_response(router_yes());
    mock.add_responses([
        MockResponse::text(CONVERSATION_END_SENTINEL),
        MockResponse::text(format!("\\n{}\\n", CONVERSATION_END_SENTINEL)),
        MockResponse::text(VALID_SERVER),
    ]);
    mock.add_response(verdict(true, &[]));
    mock.add_response(router_yes());
    mock.add_responses(composition());

    let (orchestrator, recorder) = orchestrator(mock.clone(), test_config(temp.path()));
    let outcome = orchestrator.run(REQUIREMENT).await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert!(outcome.is_valid());
    assert_eq!(outcome.summary.conversation_turn, 0);
    assert_eq!(outcome.summary.code.trim(), VALID_SERVER.trim());

    let recovery = recorder
        .events()
        .into_iter()
        .find_map(|e| match e {
            ProgressEvent::RecoveryFinished {
                stage,
                absolute_attempts,
                fragment_attempts,
                complete,
            } if stage == "generate" => Some((absolute_attempts, fragment_attempts, complete)),
            _ => None,
        })
        .unwrap();
    assert_eq!(recovery, (3, 1, true));

    // Sentinel retries are fresh requests, not continuations
    let requests = mock.requests();
    for request in &requests[5..8] {
        assert_eq!(request.messages.len(), 2);
    }
    assert_eq!(mock.call_count(), 13);
}

#[tokio::test]
async fn test_missing_improved_code_falls_back_to_prior_candidate() {
    let temp = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(router_yes());
    mock.add_responses(database_analysis(REQUIREMENT));
    mock.add_response(router_yes());
    mock.add_response(MockResponse::text(SERVER_WITHOUT_TOOLS));
    mock.add_response(verdict(false, &["No tool declarations found"]));
    for _ in 0..3 {
        mock.add_response(MockResponse::json(json!({"changes": ["Added tools"]})));
    }
    mock.add_response(verdict(false, &["No tool declarations found"]));
    mock.add_response(router_yes());
    mock.add_responses(composition());

    let config = test_config(temp.path()).with_max_turns(1);
    let (orchestrator, recorder) = orchestrator(mock.clone(), config);
    let outcome = orchestrator.run(REQUIREMENT).await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert!(!outcome.is_valid());
    assert_eq!(outcome.summary.conversation_turn, 1);
    assert_eq!(outcome.summary.code.trim(), SERVER_WITHOUT_TOOLS.trim());
    assert!(outcome.summary.revise_history[0].contains("Failed during code revision"));

    assert!(recorder
        .events()
        .iter()
        .any(|e| matches!(e, ProgressEvent::RevisionFallback { turn: 1, .. })));

    let artifacts = outcome.artifacts.as_ref().unwrap();
    let source = std::fs::read_to_string(artifacts.output_dir.join("index.ts")).unwrap();
    assert_eq!(source.trim(), SERVER_WITHOUT_TOOLS.trim());
    assert_eq!(mock.call_count(), 15);
}

#[tokio::test]
async fn test_valid_first_check_skips_revision() {
    let temp = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(router_yes());
    mock.add_responses(database_analysis(REQUIREMENT));
    mock.add_response(router_yes());
    mock.add_response(MockResponse::text(VALID_SERVER));
    mock.add_response(verdict(true, &[]));
    mock.add_response(router_yes());
    mock.add_responses(composition());

    let (orchestrator, _) = orchestrator(mock.clone(), test_config(temp.path()));
    let outcome = orchestrator.run(REQUIREMENT).await;

    assert!(outcome.is_valid());
    assert_eq!(outcome.summary.check_history.len(), 1);
    assert!(outcome.summary.revise_history.is_empty());
    assert_eq!(mock.call_count(), 11);
}

#[tokio::test]
async fn test_run_from_descriptor_skips_analysis() {
    let temp = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(router_yes());
    mock.add_response(MockResponse::text(VALID_SERVER));
    mock.add_response(verdict(true, &[]));
    mock.add_response(router_yes());
    mock.add_responses(composition());

    let descriptor = RequirementDescriptor::new(
        RequirementCategory::Browser,
        Some(vec!["Open the page".to_string(), "Take a screenshot".to_string()]),
        "screenshot a web page",
    );
    let (orchestrator, _) = orchestrator(mock.clone(), test_config(temp.path()));
    let outcome = orchestrator.run_from_descriptor(descriptor).await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert!(outcome.is_valid());
    assert_eq!(mock.call_count(), 7);

    let generation_request = &mock.requests()[1];
    assert!(generation_request.messages[0].content.contains("puppeteer"));
    assert!(generation_request.messages[1].content.contains("Take a screenshot"));
}

#[tokio::test]
async fn test_declined_composition_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(router_yes());
    mock.add_responses(database_analysis(REQUIREMENT));
    mock.add_response(router_yes());
    mock.add_response(MockResponse::text(VALID_SERVER));
    mock.add_response(verdict(true, &[]));
    mock.add_response(MockResponse::text("false"));

    let (orchestrator, _) = orchestrator(mock.clone(), test_config(temp.path()));
    let outcome = orchestrator.run(REQUIREMENT).await;

    assert_eq!(
        outcome.status,
        RunStatus::Stayed {
            stage: Stage::Generate,
            reason: "router declined".to_string()
        }
    );
    assert!(outcome.is_valid());
    assert!(outcome.artifacts.is_none());
    assert!(!temp.path().join(&outcome.run_id).exists());
}

#[tokio::test]
async fn test_concurrent_runs_write_separate_directories() {
    let temp = TempDir::new().unwrap();
    let script = |mock: &MockLLMClient| {
        mock.add_response(router_yes());
        mock.add_response(MockResponse::text(VALID_SERVER));
        mock.add_response(verdict(true, &[]));
        mock.add_response(router_yes());
        mock.add_responses(composition());
    };
    let first_mock = Arc::new(MockLLMClient::new());
    let second_mock = Arc::new(MockLLMClient::new());
    script(&first_mock);
    script(&second_mock);

    let descriptor = RequirementDescriptor::new(RequirementCategory::Other, None, "echo text");
    let (first, _) = orchestrator(first_mock, test_config(temp.path()));
    let (second, _) = orchestrator(second_mock, test_config(temp.path()));

    let (a, b) = tokio::join!(
        first.run_from_descriptor(descriptor.clone()),
        second.run_from_descriptor(descriptor)
    );

    let a_dir = a.artifacts.unwrap().output_dir;
    let b_dir = b.artifacts.unwrap().output_dir;
    assert_ne!(a_dir, b_dir);
    assert!(a_dir.join("index.ts").exists());
    assert!(b_dir.join("index.ts").exists());
}
