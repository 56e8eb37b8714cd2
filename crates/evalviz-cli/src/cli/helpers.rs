use anyhow::Context;
use evalviz_client::{ClientConfig, EvalClient};
use evalviz_core::config::{load_or_default, EvalVizConfig};
use evalviz_core::{EvalRecord, InspectorSession};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use super::args::{DatasetArgs, FilterArgs};

/// A dataset as loaded from disk or a collaborator, before filtering.
pub struct LoadedDataset {
    pub id: String,
    pub raw: String,
    pub records: Vec<EvalRecord>,
}

pub fn load_config(path: &Path) -> anyhow::Result<EvalVizConfig> {
    let cfg = load_or_default(path)?;
    debug!(path = %path.display(), "config loaded");
    Ok(cfg)
}

pub fn build_client(cfg: &EvalVizConfig) -> anyhow::Result<EvalClient> {
    Ok(EvalClient::new(ClientConfig::from(cfg))?)
}

pub async fn load_dataset(
    client: &EvalClient,
    args: &DatasetArgs,
) -> anyhow::Result<LoadedDataset> {
    match (&args.file, &args.dataset) {
        (Some(path), _) => load_file(path),
        (None, Some(id)) => load_by_id(client, id).await,
        (None, None) => anyhow::bail!("either a dataset id or --file is required"),
    }
}

/// `arg` is a path when it names an existing `.json` file, otherwise an id.
pub async fn load_dataset_arg(client: &EvalClient, arg: &str) -> anyhow::Result<LoadedDataset> {
    let path = Path::new(arg);
    if arg.ends_with(".json") && path.is_file() {
        load_file(path)
    } else {
        load_by_id(client, arg).await
    }
}

async fn load_by_id(client: &EvalClient, id: &str) -> anyhow::Result<LoadedDataset> {
    let (raw, records) = client
        .load_dataset(id)
        .await
        .with_context(|| format!("loading dataset '{id}'"))?;
    Ok(LoadedDataset {
        id: id.to_string(),
        raw,
        records,
    })
}

fn load_file(path: &Path) -> anyhow::Result<LoadedDataset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading dataset {}", path.display()))?;
    let records = evalviz_core::parse_dataset(&raw)
        .with_context(|| format!("parsing dataset {}", path.display()))?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(LoadedDataset { id, raw, records })
}

/// Installs the dataset and applies the filters; `--max-confidence` falls
/// back to `filters.max_confidence` from the config.
pub fn open_session(
    dataset: LoadedDataset,
    filter: &FilterArgs,
    cfg: &EvalVizConfig,
) -> InspectorSession {
    let mut session = InspectorSession::new();
    session.install_dataset(&dataset.id, dataset.records);
    session.set_search(filter.search.clone());
    session.set_max_confidence(filter.max_confidence.or(cfg.filters.max_confidence));
    session
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
