//! Shared argument types used across multiple commands.

use clap::ValueEnum;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Which dataset to load: an id resolved through the configured sources, or a file.
#[derive(clap::Args, Clone, Debug)]
pub struct DatasetArgs {
    /// Dataset identifier (e.g. `basic_new`); served locally when listed in the manifest
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub dataset: Option<String>,

    /// Read the dataset from a JSON file instead
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct FilterArgs {
    /// Case-insensitive substring matched against question and generated query
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Keep records whose least confident token has probability <= this value
    #[arg(long, value_parser = parse_probability)]
    pub max_confidence: Option<f64>,
}

/// Identifies one record of the working set.
#[derive(clap::Args, Clone, Debug)]
pub struct RecordArgs {
    /// Database name of the record
    #[arg(long = "db")]
    pub db_name: String,

    /// Exact question text of the record
    #[arg(long)]
    pub question: String,
}

pub fn parse_probability(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{v} is outside [0, 1]"))
    }
}
