//! mcpsmith - LLM-driven generator for MCP servers
//!
//! A requirement in plain language goes through a fixed sequence of stages:
//! analysis turns it into a typed descriptor, generation produces a
//! TypeScript MCP server and repairs it against a checklist, and composition
//! writes the server with its `package.json`, `tsconfig.json` and `README.md`.
//! A model-driven router decides every hand-off between stages.
//!
//! # Example Usage
//!
//! ```ignore
//! use mcpsmith::llm::{MockLLMClient, MockResponse};
//! use mcpsmith::pipeline::{PipelineConfig, PipelineContext, PipelineOrchestrator};
//! use std::sync::Arc;
//!
//! async fn generate(client: Arc<MockLLMClient>) {
//!     let context = PipelineContext::new(client, PipelineConfig::new());
//!     let outcome = PipelineOrchestrator::new(context)
//!         .run("A server that takes screenshots of web pages")
//!         .await;
//!     println!("valid: {}", outcome.is_valid());
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`pipeline`]: stages, router, generation-check-repair loop and orchestrator
//! - [`extract`]: structured-payload recovery from noisy model output
//! - [`llm`]: client abstraction, genai backend, mock and retry decorator
//! - [`progress`]: run progress events

pub mod cli;
pub mod config;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod util;

pub use config::{ConfigError, SmithConfig};
pub use extract::{extract, extract_as, Extraction, ExtractionError};
pub use llm::{BackendError, LLMClient, MockLLMClient, RetryPolicy, RetryingLLMClient};
pub use pipeline::{
    PipelineConfig, PipelineContext, PipelineOrchestrator, RunOutcome, RunStatus, Stage,
};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
