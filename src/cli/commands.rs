use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;

/// LLM-driven generator for MCP servers
#[derive(Parser, Debug)]
#[command(
    name = "mcpsmith",
    about = "Generate MCP servers from plain-language requirements",
    version,
    author,
    long_about = "mcpsmith analyses a requirement, generates a TypeScript MCP server, checks it \
                  against a rubric and repairs it until it passes or the turn budget runs out, \
                  then writes the server together with package.json, tsconfig.json and README.md. \
                  It supports multiple AI backends (Ollama, OpenAI, Claude, Gemini, Grok, Groq)."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Enable debug logging"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate an MCP server from a requirement",
        long_about = "Runs the full pipeline: analysis, generation with check-and-repair, \
                      and composition of the project files.\n\n\
                      Examples:\n  \
                      mcpsmith run \"A server that lists rows of a SQLite table\"\n  \
                      mcpsmith run --descriptor brief.json\n  \
                      mcpsmith run --backend claude --format json \"Take a screenshot of a URL\""
    )]
    Run(RunArgs),

    #[command(
        about = "Extract a structured value from model output",
        long_about = "Applies the structured-extraction strategies to a file or stdin and \
                      prints the recovered JSON value.\n\n\
                      Examples:\n  \
                      mcpsmith extract response.txt\n  \
                      cat response.txt | mcpsmith extract"
    )]
    Extract(ExtractArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(
        value_name = "REQUIREMENT",
        required_unless_present = "descriptor",
        conflicts_with = "descriptor",
        help = "Free-form requirement text"
    )]
    pub requirement: Option<String>,

    #[arg(
        short = 'd',
        long,
        value_name = "FILE",
        help = "Start from a JSON requirement descriptor and skip analysis"
    )]
    pub descriptor: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'b',
        long,
        value_parser = parse_adapter_kind,
        help = "AI backend provider (defaults to MCPSMITH_PROVIDER or ollama)"
    )]
    pub backend: Option<AdapterKind>,

    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Model name to use (provider-specific)"
    )]
    pub model: Option<String>,

    #[arg(long, value_name = "SECONDS", help = "Request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "N", help = "Revision turns before giving up")]
    pub max_turns: Option<usize>,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Root directory for generated projects"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(value_name = "FILE", help = "File to read (defaults to stdin)")]
    pub input: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "json",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    crate::config::parse_provider(s).map_err(|e| e.to_string())
}
