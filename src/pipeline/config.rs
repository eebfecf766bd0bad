use super::stage::StageSpec;
use crate::llm::RetryPolicy;
use std::path::PathBuf;

/// Settings for one pipeline run, passed explicitly into every stage
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub stages: Vec<StageSpec>,
    /// Conversational turns (REVISE passes) before the loop gives up
    pub max_turns: usize,
    /// Model calls allowed inside one GENERATE or REVISE pass, sentinels included
    pub max_absolute_attempts: usize,
    /// Real fragments allowed inside one GENERATE or REVISE pass
    pub fragment_attempts: usize,
    /// Length ratio above which a fresh fragment replaces the running candidate
    pub merge_ratio: f64,
    pub max_router_iterations: usize,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub retry: RetryPolicy,
    /// Each run writes into its own subdirectory of this root
    pub output_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: StageSpec::default_stages(),
            max_turns: 3,
            max_absolute_attempts: 10,
            fragment_attempts: 3,
            merge_ratio: 1.2,
            max_router_iterations: 12,
            max_tokens: 8192,
            temperature: None,
            retry: RetryPolicy::default(),
            output_root: PathBuf::from("result"),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stages(mut self, stages: Vec<StageSpec>) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_max_absolute_attempts(mut self, max_absolute_attempts: usize) -> Self {
        self.max_absolute_attempts = max_absolute_attempts;
        self
    }

    pub fn with_fragment_attempts(mut self, fragment_attempts: usize) -> Self {
        self.fragment_attempts = fragment_attempts;
        self
    }

    pub fn with_merge_ratio(mut self, merge_ratio: f64) -> Self {
        self.merge_ratio = merge_ratio;
        self
    }

    pub fn with_max_router_iterations(mut self, max_router_iterations: usize) -> Self {
        self.max_router_iterations = max_router_iterations;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    /// Output directory owned by the run with `run_id`
    pub fn run_output_dir(&self, run_id: &str) -> PathBuf {
        self.output_root.join(run_id)
    }
}
