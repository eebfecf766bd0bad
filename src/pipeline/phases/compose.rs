//! Packaging artifacts derived from the final candidate

use crate::extract::strip_code_fence;
use crate::llm::ChatMessage;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::prompts::{render, PACKAGE_PROMPT, README_PROMPT, TSCONFIG_PROMPT};
use crate::pipeline::stage::Stage;
use crate::pipeline::state::{ComposedArtifacts, PipelineState};
use crate::progress::ProgressEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const SOURCE_FILE: &str = "index.ts";
pub const MANIFEST_FILE: &str = "package.json";
pub const BUILD_CONFIG_FILE: &str = "tsconfig.json";
pub const DOCS_FILE: &str = "README.md";

/// Derived file contents, before anything is written
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub manifest: String,
    pub build_config: String,
    pub docs: String,
}

async fn derive(context: &PipelineContext, template: &str, code: &str, what: &str) -> Result<String> {
    let messages = vec![
        ChatMessage::system(render(template, &[("code", code)])),
        ChatMessage::user(format!("Write the {} now.", what)),
    ];
    context
        .complete(messages)
        .await
        .with_context(|| format!("Failed to generate {}", what))
}

/// Asks for the manifest, build configuration and documentation of `code`
pub async fn compose(context: &PipelineContext, code: &str) -> Result<Composition> {
    let manifest = derive(context, PACKAGE_PROMPT, code, MANIFEST_FILE).await?;
    let build_config = derive(context, TSCONFIG_PROMPT, code, BUILD_CONFIG_FILE).await?;
    let docs = derive(context, README_PROMPT, code, DOCS_FILE).await?;

    Ok(Composition {
        manifest: strip_code_fence(&manifest, Some("json")),
        build_config: strip_code_fence(&build_config, Some("json")),
        docs,
    })
}

async fn write_artifact(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "Wrote artifact");
    Ok(path)
}

/// Writes the source and its derived files into `dir`, creating it if needed
pub async fn persist(dir: &Path, code: &str, composition: &Composition) -> Result<ComposedArtifacts> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let files = vec![
        write_artifact(dir, SOURCE_FILE, code).await?,
        write_artifact(dir, MANIFEST_FILE, &composition.manifest).await?,
        write_artifact(dir, BUILD_CONFIG_FILE, &composition.build_config).await?,
        write_artifact(dir, DOCS_FILE, &composition.docs).await?,
    ];

    let summary = format!(
        "Successfully generated MCP server files:\n\
         - {}: MCP server source code\n\
         - {}: dependencies and scripts\n\
         - {}: TypeScript compiler configuration\n\
         - {}: usage documentation\n\
         All files have been saved to '{}'.",
        SOURCE_FILE,
        MANIFEST_FILE,
        BUILD_CONFIG_FILE,
        DOCS_FILE,
        dir.display()
    );

    Ok(ComposedArtifacts {
        output_dir: dir.to_path_buf(),
        files,
        summary,
    })
}

pub struct ComposePhase;

#[async_trait]
impl WorkflowPhase for ComposePhase {
    fn stage(&self) -> Stage {
        Stage::Compose
    }

    async fn execute(&self, context: &PipelineContext, state: &mut PipelineState) -> Result<()> {
        let code = state
            .candidate
            .as_ref()
            .map(|c| c.source_text.clone())
            .context("Composition requires a generated candidate")?;

        let composition = compose(context, &code).await?;
        let dir = context.config.run_output_dir(&state.run_id);
        let artifacts = persist(&dir, &code, &composition).await?;

        info!(output_dir = %dir.display(), files = artifacts.files.len(), "Composed MCP server project");
        context.report(ProgressEvent::ArtifactsWritten {
            output_dir: dir.display().to_string(),
            files: artifacts.files.len(),
        });

        state.push_message(ChatMessage::assistant(artifacts.summary.clone()));
        state.artifacts = Some(artifacts);
        Ok(())
    }
}
