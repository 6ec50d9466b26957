use crate::config::DEFAULT_ANALYZE_ENDPOINT;
use crate::core::intake::IntakeForm;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_positive_number, validate_url, Validate};
use clap::{Args, Parser, Subcommand};

/// 臨床評估表單：每個清單欄位以逗號分隔
#[derive(Debug, Clone, Parser)]
#[command(name = "prompt-pt")]
#[command(about = "Submit a physical therapy intake and print the generated treatment plan")]
pub struct IntakeArgs {
    #[arg(long, default_value = DEFAULT_ANALYZE_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, default_value = "")]
    pub diagnosis: String,

    #[arg(long, default_value = "", help = "Comma separated, e.g. \"pain, swelling\"")]
    pub symptoms: String,

    #[arg(long, default_value = "")]
    pub pain_with_movement: String,

    #[arg(long, default_value = "")]
    pub tenderness_to_palpation: String,

    #[arg(long, default_value = "", help = "acute, subacute or chronic")]
    pub healing_stage: String,

    #[arg(long, default_value = "")]
    pub functional_limitations: String,

    #[arg(long, default_value = "", help = "Pain level from 0 to 10")]
    pub pain_level: String,

    #[arg(long, default_value = "")]
    pub constraints: String,

    #[arg(long, help = "Print the raw JSON result instead of the formatted plan")]
    pub json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl IntakeArgs {
    pub fn to_form(&self) -> IntakeForm {
        IntakeForm {
            symptoms: self.symptoms.clone(),
            diagnosis: self.diagnosis.clone(),
            healing_stage: self.healing_stage.clone(),
            functional_limitations: self.functional_limitations.clone(),
            pain_level: self.pain_level.clone(),
            pain_with_movement: self.pain_with_movement.clone(),
            tenderness_to_palpation: self.tenderness_to_palpation.clone(),
            constraints: self.constraints.clone(),
        }
    }
}

impl Validate for IntakeArgs {
    fn validate(&self) -> Result<()> {
        validate_url("endpoint", &self.endpoint)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "prompt-server")]
#[command(about = "Serve the analyze API backed by retrieval-augmented generation")]
pub struct ServerArgs {
    #[arg(long, default_value = "prompt.toml")]
    pub config: String,

    #[arg(long, help = "Override server.bind_address")]
    pub bind: Option<String>,

    #[arg(long, help = "Emit JSON logs")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "prompt-ingest")]
#[command(about = "Load PubMed research into the vector store")]
pub struct IngestArgs {
    #[arg(long, default_value = "prompt.toml", global = true)]
    pub config: String,

    #[arg(long, help = "Enable system monitoring (CPU and memory usage)", global = true)]
    pub monitor: bool,

    #[arg(long, help = "Enable verbose output", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: IngestCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum IngestCommand {
    /// Fetch every configured condition and store it
    Bulk(RunArgs),
    /// High quality refresh: systematic reviews, meta-analyses and RCTs only
    Refresh(RunArgs),
    /// Fetch a single query and print the articles without storing them
    Fetch(FetchArgs),
    /// Embed a query and print the closest stored documents
    Search(SearchArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(long, value_delimiter = ',', help = "Override the configured condition list")]
    pub conditions: Vec<String>,

    #[arg(long, help = "Override results per condition")]
    pub max_results: Option<usize>,

    #[arg(long, help = "Override the pause between conditions, in seconds")]
    pub delay_seconds: Option<u64>,

    #[arg(long, help = "Write a JSON run report into this directory")]
    pub report_dir: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    pub query: String,

    #[arg(long, default_value = "5")]
    pub max_results: usize,

    #[arg(long, help = "Use the high quality filter")]
    pub high_quality: bool,
}

#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long, default_value = "5")]
    pub match_count: usize,
}

impl Validate for IngestArgs {
    fn validate(&self) -> Result<()> {
        match &self.command {
            IngestCommand::Bulk(run) | IngestCommand::Refresh(run) => {
                if let Some(max_results) = run.max_results {
                    validate_positive_number("max_results", max_results, 1)?;
                }
                if let Some(dir) = &run.report_dir {
                    validate_path("report_dir", dir)?;
                }
            }
            IngestCommand::Fetch(fetch) => {
                validate_positive_number("max_results", fetch.max_results, 1)?;
            }
            IngestCommand::Search(search) => {
                validate_positive_number("match_count", search.match_count, 1)?;
            }
        }
        Ok(())
    }
}
