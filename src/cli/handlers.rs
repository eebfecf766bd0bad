//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 when the run produced a
//! server that passed its checks, 2 when it finished without a valid server,
//! 1 on any error.

use super::commands::{ExtractArgs, RunArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::{default_model, SmithConfig};
use crate::extract::extract;
use crate::llm::select_llm_client;
use crate::pipeline::{
    DescriptorPayload, PipelineContext, PipelineOrchestrator, RequirementDescriptor, RunOutcome,
};
use crate::progress::LoggingHandler;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const EXIT_VALID: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_INVALID: i32 = 2;

/// Folds command-line overrides into the environment configuration
pub fn apply_run_overrides(mut config: SmithConfig, args: &RunArgs) -> SmithConfig {
    if let Some(provider) = args.backend {
        if provider != config.provider && args.model.is_none() {
            config.model = default_model(provider).to_string();
        }
        config.provider = provider;
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }
    if let Some(max_turns) = args.max_turns {
        config.max_turns = max_turns;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    config
}

/// Loads a descriptor from a JSON file in the analysis output schema
pub fn load_descriptor(path: &Path) -> Result<RequirementDescriptor> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read descriptor {}", path.display()))?;
    let payload: DescriptorPayload = serde_json::from_str(&content)
        .with_context(|| format!("Descriptor {} is not valid JSON", path.display()))?;
    Ok(RequirementDescriptor::from_payload(payload, ""))
}

pub fn exit_code_for(outcome: &RunOutcome) -> i32 {
    if outcome.is_valid() {
        EXIT_VALID
    } else {
        EXIT_INVALID
    }
}

async fn run(args: &RunArgs, quiet: bool) -> Result<RunOutcome> {
    let config = apply_run_overrides(SmithConfig::default(), args);
    config.validate().context("Invalid configuration")?;
    debug!("{}", config);

    let descriptor = args.descriptor.as_deref().map(load_descriptor).transpose()?;

    let selected = select_llm_client(&config).await?;
    if !quiet {
        info!(backend = %selected.description, "Selected LLM backend");
    }

    let context = PipelineContext::new(selected.client, config.pipeline_config())
        .with_progress(Arc::new(LoggingHandler));
    let orchestrator = PipelineOrchestrator::new(context);

    let outcome = match (descriptor, &args.requirement) {
        (Some(descriptor), _) => orchestrator.run_from_descriptor(descriptor).await,
        (None, Some(requirement)) => orchestrator.run(requirement).await,
        (None, None) => anyhow::bail!("Either a requirement or --descriptor is required"),
    };
    Ok(outcome)
}

pub async fn handle_run(args: &RunArgs, quiet: bool) -> i32 {
    let outcome = match run(args, quiet).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return EXIT_ERROR;
        }
    };

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    match formatter.format(&outcome) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_ERROR;
        }
    }
    exit_code_for(&outcome)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// Exit code is 0 when a payload was recovered, 2 otherwise
pub fn handle_extract(args: &ExtractArgs) -> i32 {
    let text = match read_input(args.input.as_deref()) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_ERROR;
        }
    };

    let extraction = extract(&text);
    let parsed = extraction.is_parsed();
    match OutputFormatter::new(OutputFormat::from(args.format)).format_extraction(extraction) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_ERROR;
        }
    }

    if parsed {
        EXIT_VALID
    } else {
        EXIT_INVALID
    }
}
