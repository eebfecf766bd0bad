//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use mcpsmith::llm::{MockLLMClient, MockResponse, RetryPolicy};
use mcpsmith::pipeline::{PipelineConfig, PipelineContext, PipelineOrchestrator};
use mcpsmith::progress::{ProgressEvent, ProgressHandler};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const VALID_SERVER: &str = r#"import { Server } from "@modelcontextprotocol/sdk/server/index.js";
import { StdioServerTransport } from "@modelcontextprotocol/sdk/server/stdio.js";

const server = new Server({ name: "db-logs", version: "0.1.0" }, { capabilities: { tools: {} } });

server.setRequestHandler(ListToolsRequestSchema, async () => {
  return { tools: [{ name: "organize_logs", inputSchema: { type: "object" } }] };
});

main();

async function main() {
  await server.connect(new StdioServerTransport());
}
"#;

pub const SERVER_WITHOUT_TOOLS: &str = r#"import { Server } from "@modelcontextprotocol/sdk/server/index.js";

const server = new Server({ name: "db-logs", version: "0.1.0" }, { capabilities: {} });

main();

async function main() {
  await server.connect(new StdioServerTransport());
}
"#;

/// Collects every progress event of a run
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn test_config(output_root: &Path) -> PipelineConfig {
    PipelineConfig::new()
        .with_retry(RetryPolicy::immediate(1))
        .with_output_root(output_root)
}

pub fn orchestrator(
    mock: Arc<MockLLMClient>,
    config: PipelineConfig,
) -> (PipelineOrchestrator, Arc<RecordingHandler>) {
    let recorder = Arc::new(RecordingHandler::default());
    let context = PipelineContext::new(mock, config).with_progress(recorder.clone());
    (PipelineOrchestrator::new(context), recorder)
}

pub fn router_yes() -> MockResponse {
    MockResponse::text("true")
}

/// Decompose, refine and finalize answers for a database requirement
pub fn database_analysis(requirement: &str) -> Vec<MockResponse> {
    vec![
        MockResponse::text(
            "1. Connect to the database\n2. Find the log table\n3. Sort and prune old rows",
        ),
        MockResponse::text("Refined: connect, locate the log table, prune rows older than 30 days"),
        MockResponse::text(format!(
            "Here is the result:\n```json\n{}\n```",
            json!({
                "requirement_type": "database",
                "operation_details": [
                    "Connect to the database",
                    "Locate the log table",
                    "Prune rows older than 30 days"
                ],
                "requirement": requirement
            })
        )),
    ]
}

pub fn verdict(tools_pass: bool, errors: &[&str]) -> MockResponse {
    MockResponse::json(verdict_value(tools_pass, errors))
}

pub fn verdict_value(tools_pass: bool, errors: &[&str]) -> Value {
    json!({
        "isValid": tools_pass,
        "checkResults": {
            "baseProtocol": {"passed": true, "issues": []},
            "serverSetup": {"passed": true, "issues": []},
            "handlers": {"passed": true, "issues": []},
            "tools": {
                "passed": tools_pass,
                "issues": errors,
            }
        },
        "summary": {"errors": errors, "warnings": []}
    })
}

/// Manifest, build configuration and docs answers
pub fn composition() -> Vec<MockResponse> {
    vec![
        MockResponse::text("```json\n{\"name\": \"db-logs\", \"type\": \"module\"}\n```"),
        MockResponse::text("{\"compilerOptions\": {\"target\": \"ES2022\", \"outDir\": \"build\"}}"),
        MockResponse::text("# db-logs\n\nAn MCP server that organizes the database log table."),
    ]
}
