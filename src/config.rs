//! Configuration management for mcpsmith
//!
//! Settings are loaded from environment variables with sensible defaults and
//! converted into an explicit [`PipelineConfig`] that every stage receives.
//!
//! # Environment Variables
//!
//! - `MCPSMITH_PROVIDER`: Provider selection (ollama|openai|claude|gemini|grok|groq) - default: "ollama"
//! - `MCPSMITH_MODEL`: Model name - default depends on the provider
//! - `MCPSMITH_REQUEST_TIMEOUT`: Timeout in seconds - default: "120"
//! - `MCPSMITH_LOG_LEVEL`: Logging level - default: "info"
//! - `MCPSMITH_MAX_TURNS`: Revision turns before giving up - default: "3"
//! - `MCPSMITH_MAX_ABSOLUTE_ATTEMPTS`: Hard cap on calls per recovery loop - default: "10"
//! - `MCPSMITH_FRAGMENT_ATTEMPTS`: Fragment attempts per recovery loop - default: "3"
//! - `MCPSMITH_MERGE_RATIO`: Length ratio above which a fragment replaces the candidate - default: "1.2"
//! - `MCPSMITH_RETRY_ATTEMPTS`: Attempts per text-generation call - default: "3"
//! - `MCPSMITH_MAX_TOKENS`: Maximum tokens per response - default: "8192"
//! - `MCPSMITH_OUTPUT_DIR`: Root directory for generated projects - default: "result"
//! - `MCPSMITH_MAX_ROUTER_ITERATIONS`: Hard cap on routing decisions per run - default: "12"
//!
//! Provider credentials are read by genai directly (`OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`, `GEMINI_API_KEY`, `XAI_API_KEY`, `GROQ_API_KEY`,
//! `OLLAMA_HOST`).

use crate::llm::RetryPolicy;
use crate::pipeline::PipelineConfig;
use genai::adapter::AdapterKind;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-7-sonnet-latest";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_XAI_MODEL: &str = "grok-3";
const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_TURNS: usize = 3;
const DEFAULT_MAX_ABSOLUTE_ATTEMPTS: usize = 10;
const DEFAULT_FRAGMENT_ATTEMPTS: usize = 3;
const DEFAULT_MERGE_RATIO: f64 = 1.2;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_MAX_TOKENS: u32 = 8192;
const DEFAULT_OUTPUT_DIR: &str = "result";
const DEFAULT_MAX_ROUTER_ITERATIONS: usize = 12;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: ollama, openai, claude, gemini, grok, groq")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone)]
pub struct SmithConfig {
    pub provider: AdapterKind,
    pub model: String,
    pub request_timeout_secs: u64,
    pub log_level: String,
    pub max_turns: usize,
    pub max_absolute_attempts: usize,
    pub fragment_attempts: usize,
    pub merge_ratio: f64,
    pub retry_attempts: u32,
    pub max_tokens: u32,
    pub output_dir: PathBuf,
    pub max_router_iterations: usize,
}

/// Maps a user-facing provider name to the genai adapter
pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    match name.to_lowercase().as_str() {
        "ollama" => Ok(AdapterKind::Ollama),
        "openai" => Ok(AdapterKind::OpenAI),
        "claude" | "anthropic" => Ok(AdapterKind::Anthropic),
        "gemini" => Ok(AdapterKind::Gemini),
        "grok" | "xai" => Ok(AdapterKind::Xai),
        "groq" => Ok(AdapterKind::Groq),
        other => Err(ConfigError::InvalidProvider(other.to_string())),
    }
}

/// Default model for a provider
pub fn default_model(provider: AdapterKind) -> &'static str {
    match provider {
        AdapterKind::OpenAI => DEFAULT_OPENAI_MODEL,
        AdapterKind::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        AdapterKind::Gemini => DEFAULT_GEMINI_MODEL,
        AdapterKind::Xai => DEFAULT_XAI_MODEL,
        AdapterKind::Groq => DEFAULT_GROQ_MODEL,
        _ => DEFAULT_OLLAMA_MODEL,
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Default for SmithConfig {
    fn default() -> Self {
        let provider = env::var("MCPSMITH_PROVIDER")
            .ok()
            .and_then(|s| parse_provider(&s).ok())
            .unwrap_or(AdapterKind::Ollama);

        let model = env::var("MCPSMITH_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model(provider).to_string());

        let log_level = env::var("MCPSMITH_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let output_dir = env::var("MCPSMITH_OUTPUT_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Self {
            provider,
            model,
            request_timeout_secs: env_parsed("MCPSMITH_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS),
            log_level,
            max_turns: env_parsed("MCPSMITH_MAX_TURNS", DEFAULT_MAX_TURNS),
            max_absolute_attempts: env_parsed(
                "MCPSMITH_MAX_ABSOLUTE_ATTEMPTS",
                DEFAULT_MAX_ABSOLUTE_ATTEMPTS,
            ),
            fragment_attempts: env_parsed("MCPSMITH_FRAGMENT_ATTEMPTS", DEFAULT_FRAGMENT_ATTEMPTS),
            merge_ratio: env_parsed("MCPSMITH_MERGE_RATIO", DEFAULT_MERGE_RATIO),
            retry_attempts: env_parsed("MCPSMITH_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS),
            max_tokens: env_parsed("MCPSMITH_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            output_dir,
            max_router_iterations: env_parsed(
                "MCPSMITH_MAX_ROUTER_ITERATIONS",
                DEFAULT_MAX_ROUTER_ITERATIONS,
            ),
        }
    }
}

impl SmithConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model name cannot be empty".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 3600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 1 hour".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if self.max_turns == 0 || self.max_turns > 20 {
            return Err(ConfigError::ValidationFailed(
                "Max turns must be between 1 and 20".to_string(),
            ));
        }

        if self.fragment_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "Fragment attempts must be at least 1".to_string(),
            ));
        }
        if self.max_absolute_attempts < self.fragment_attempts {
            return Err(ConfigError::ValidationFailed(format!(
                "Max absolute attempts ({}) cannot be lower than fragment attempts ({})",
                self.max_absolute_attempts, self.fragment_attempts
            )));
        }
        if self.max_absolute_attempts > 100 {
            return Err(ConfigError::ValidationFailed(
                "Max absolute attempts cannot exceed 100".to_string(),
            ));
        }

        if !self.merge_ratio.is_finite() || self.merge_ratio < 1.0 {
            return Err(ConfigError::ValidationFailed(
                "Merge ratio must be a finite number of at least 1.0".to_string(),
            ));
        }

        if self.retry_attempts == 0 || self.retry_attempts > 10 {
            return Err(ConfigError::ValidationFailed(
                "Retry attempts must be between 1 and 10".to_string(),
            ));
        }

        if self.max_tokens < 256 {
            return Err(ConfigError::ValidationFailed(
                "Max tokens must be at least 256".to_string(),
            ));
        }

        if self.max_router_iterations < 2 {
            return Err(ConfigError::ValidationFailed(
                "Max router iterations must be at least 2".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds the per-run pipeline settings
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_max_turns(self.max_turns)
            .with_max_absolute_attempts(self.max_absolute_attempts)
            .with_fragment_attempts(self.fragment_attempts)
            .with_merge_ratio(self.merge_ratio)
            .with_max_router_iterations(self.max_router_iterations)
            .with_max_tokens(self.max_tokens)
            .with_retry(RetryPolicy::default().with_max_attempts(self.retry_attempts))
            .with_output_root(self.output_dir.clone())
    }
}

impl fmt::Display for SmithConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mcpsmith Configuration:")?;
        writeln!(f, "  Provider: {:?}", self.provider)?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Max Turns: {}", self.max_turns)?;
        writeln!(f, "  Max Absolute Attempts: {}", self.max_absolute_attempts)?;
        writeln!(f, "  Fragment Attempts: {}", self.fragment_attempts)?;
        writeln!(f, "  Merge Ratio: {}", self.merge_ratio)?;
        writeln!(f, "  Retry Attempts: {}", self.retry_attempts)?;
        writeln!(f, "  Max Tokens: {}", self.max_tokens)?;
        writeln!(f, "  Output Dir: {}", self.output_dir.display())?;
        writeln!(f, "  Max Router Iterations: {}", self.max_router_iterations)?;
        Ok(())
    }
}
