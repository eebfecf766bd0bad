use serde::{Deserialize, Serialize};
use std::fmt;

/// Named step in the routed pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Start,
    Analyse,
    Generate,
    Compose,
    End,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Analyse => "analyse",
            Stage::Generate => "generate",
            Stage::Compose => "compose",
            Stage::End => "end",
        }
    }

    pub fn default_description(&self) -> &'static str {
        match self {
            Stage::Start => "Receive the user's requirement for an MCP server",
            Stage::Analyse => {
                "Analyse the requirement into a category and an ordered list of operations"
            }
            Stage::Generate => {
                "Generate the MCP server code, check it against the protocol and revise it"
            }
            Stage::Compose => "Write package.json, tsconfig.json and README.md for the server",
            Stage::End => "Finish the conversation",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::End)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Entry of the ordered stage list the router walks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub stage: Stage,
    pub description: String,
}

impl StageSpec {
    pub fn new(stage: Stage, description: impl Into<String>) -> Self {
        Self {
            stage,
            description: description.into(),
        }
    }

    pub fn default_stages() -> Vec<StageSpec> {
        [
            Stage::Start,
            Stage::Analyse,
            Stage::Generate,
            Stage::Compose,
            Stage::End,
        ]
        .into_iter()
        .map(|stage| StageSpec::new(stage, stage.default_description()))
        .collect()
    }
}

/// Stage following `current` in `stages`, if any
pub fn next_stage(stages: &[StageSpec], current: Stage) -> Option<&StageSpec> {
    let position = stages.iter().position(|s| s.stage == current)?;
    stages.get(position + 1)
}
