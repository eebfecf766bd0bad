//! Output formatting for run outcomes and extraction results
//!
//! JSON and YAML serialize the outcome as-is; the human format renders a
//! compact report with the verdict, the turn count and the written files.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::extract::{Extraction, Strategy};
use crate::pipeline::{RunOutcome, RunStatus};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, outcome: &RunOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(outcome).context("Failed to serialize run outcome to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(outcome).context("Failed to serialize run outcome to YAML")
            }
            OutputFormat::Human => Ok(self.format_human(outcome)),
        }
    }

    /// Formats an extraction result; failures render their error payload
    pub fn format_extraction(&self, extraction: Extraction) -> Result<String> {
        let strategy = extraction.strategy();
        let value = extraction.into_value();
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&value).context("Failed to serialize payload to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(&value).context("Failed to serialize payload to YAML")
            }
            OutputFormat::Human => Ok(Self::format_extraction_human(&value, strategy)),
        }
    }

    fn format_human(&self, outcome: &RunOutcome) -> String {
        let mut output = String::new();
        let summary = &outcome.summary;

        if summary.is_valid {
            output.push_str("\u{2713} MCP Server Generated\n");
        } else {
            output.push_str("\u{26A0} MCP Server Generated (Failed Checks)\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Run:           {}\n", outcome.run_id));
        output.push_str(&format!("Status:        {}\n", describe_status(&outcome.status)));
        output.push_str(&format!("Final Stage:   {}\n", outcome.final_stage));
        if let Some(descriptor) = &outcome.descriptor {
            output.push_str(&format!("Category:      {}\n", descriptor.category().as_str()));
        }
        output.push_str(&format!("Revisions:     {}\n", summary.conversation_turn));
        output.push_str(&format!("Checks:        {}\n", summary.check_history.len()));
        let elapsed = outcome.finished_at - outcome.started_at;
        output.push_str(&format!(
            "Duration:      {:.1}s\n\n",
            elapsed.num_milliseconds() as f64 / 1000.0
        ));

        match &outcome.artifacts {
            Some(artifacts) => {
                output.push_str(&format!("Output: {}\n", artifacts.output_dir.display()));
                for (i, file) in artifacts.files.iter().enumerate() {
                    let is_last = i == artifacts.files.len() - 1;
                    let connector = if is_last { "\u{2514}" } else { "\u{251C}" };
                    let name = file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.display().to_string());
                    output.push_str(&format!("{}\u{2500} {}\n", connector, name));
                }
            }
            None => output.push_str("Output: (no files written)\n"),
        }

        if !summary.is_valid {
            if let Some(errors) = last_check_errors(&summary.check_history) {
                output.push_str("\n\u{26A0} Last check errors:\n");
                for error in errors {
                    output.push_str(&format!("  - {}\n", error));
                }
            }
        }

        output
    }

    fn format_extraction_human(value: &Value, strategy: Option<Strategy>) -> String {
        let mut output = String::new();
        match strategy {
            Some(strategy) => output.push_str(&format!("\u{2713} Extracted ({:?})\n", strategy)),
            None => output.push_str("\u{2717} Extraction failed\n"),
        }
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
        output.push('\n');
        output
    }
}

fn describe_status(status: &RunStatus) -> String {
    match status {
        RunStatus::Completed => "completed".to_string(),
        RunStatus::Stayed { stage, reason } => format!("stopped at {} ({})", stage, reason),
        RunStatus::Failed { stage, error } => format!("failed in {}: {}", stage, error),
        RunStatus::IterationCapReached { iterations } => {
            format!("iteration cap reached after {} decisions", iterations)
        }
    }
}

fn last_check_errors(check_history: &[String]) -> Option<Vec<String>> {
    let last: Value = serde_json::from_str(check_history.last()?).ok()?;
    let errors: Vec<String> = last
        .pointer("/summary/errors")?
        .as_array()?
        .iter()
        .filter_map(|e| e.as_str().map(str::to_string))
        .collect();
    (!errors.is_empty()).then_some(errors)
}
