use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod common;
pub use common::*;


#[derive(Parser)]
#[command(
    name = "evalviz",
    version,
    about = "Inspect text-to-SQL evaluation runs: accuracy by category, token confidence, attention replay"
)]
pub struct Cli {
    /// Config file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "evalviz.yaml", env = "EVALVIZ_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Per-category accuracy of a filtered dataset
    Summary(SummaryArgs),
    /// Show one record: queries, token confidence, optional query runs
    Inspect(InspectArgs),
    /// Compare category accuracy of two datasets
    Compare(CompareArgs),
    /// Replay the attention trace of one record's prompt
    Attention(AttentionArgs),
    /// Execute a query against the query execution endpoint
    RunQuery(RunQueryArgs),
    /// Render table metadata as a DDL prompt block
    Ddl(DdlArgs),
    /// Send a prompt to a completion server and show its token confidence
    Freeform(FreeformArgs),
    /// Regenerate fnames.json from the datasets in a directory
    Manifest(ManifestArgs),
}

#[derive(clap::Args, Clone, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Also print one mark per record for each category (+ correct, x exec error, - wrong)
    #[arg(long)]
    pub grid: bool,

    /// Write a machine-readable summary to this path
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunTarget {
    Golden,
    Generated,
    PostgresGolden,
}

#[derive(clap::Args, Clone, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub record: RecordArgs,

    /// Execute queries for this record (repeatable)
    #[arg(long = "run", value_enum)]
    pub runs: Vec<RunTarget>,

    /// Print the per-token confidence table
    #[arg(long)]
    pub tokens: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Clone, Debug)]
pub struct CompareArgs {
    /// Left dataset: an id, or a path to a .json file
    pub left: String,

    /// Right dataset: an id, or a path to a .json file
    pub right: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// List questions whose correctness differs
    #[arg(long)]
    pub questions: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Clone, Debug)]
pub struct AttentionArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub record: RecordArgs,

    /// Step to show; clamped into the trace
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub step: i64,

    /// Print every step instead of one
    #[arg(long, conflicts_with = "step")]
    pub all: bool,

    /// Model whose attention is requested (defaults to the configured model)
    #[arg(long)]
    pub model_name: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Clone, Debug)]
pub struct RunQueryArgs {
    /// SQL to execute; `{placeholder}` braces are stripped
    #[arg(long)]
    pub query: String,

    #[arg(long, default_value = "postgres")]
    pub db_type: String,

    #[arg(long)]
    pub db_name: String,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Clone, Debug)]
pub struct DdlArgs {
    #[arg(long, env = "EVALVIZ_API_KEY", hide_env_values = true)]
    pub api_key: String,
}

#[derive(clap::Args, Clone, Debug)]
pub struct FreeformArgs {
    /// Completion server URL
    #[arg(long)]
    pub url: String,

    /// Prompt text
    #[arg(long, required_unless_present = "prompt_file", conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Read the prompt from a file
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Fill the prompt's table metadata from the metadata endpoint
    #[arg(long, env = "EVALVIZ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ManifestArgs {
    /// Dataset directory (defaults to datasets.local_dir)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Print the manifest instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}
