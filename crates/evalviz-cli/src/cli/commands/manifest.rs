use std::path::Path;

use anyhow::Context;
use evalviz_core::config::MANIFEST_FILE;
use tracing::info;

use crate::cli::args::ManifestArgs;
use crate::cli::helpers::load_config;
use crate::exit_codes::EXIT_SUCCESS;

const EXCLUDED: [&str; 2] = ["manifest.json", MANIFEST_FILE];

/// Dataset file names in `dir`, sorted.
fn dataset_files(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") && !EXCLUDED.contains(&name.as_str()) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

pub fn run(args: ManifestArgs, config_path: &Path) -> anyhow::Result<i32> {
    let cfg = load_config(config_path)?;
    let dir = args.dir.unwrap_or(cfg.datasets.local_dir);
    let names = dataset_files(&dir)?;
    let json = serde_json::to_string(&names)?;

    if args.dry_run {
        println!("{json}");
    } else {
        let out = dir.join(MANIFEST_FILE);
        std::fs::write(&out, json).with_context(|| format!("writing {}", out.display()))?;
        info!(path = %out.display(), datasets = names.len(), "manifest written");
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_manifests_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "fnames.json", "manifest.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        assert_eq!(dataset_files(dir.path()).unwrap(), vec!["a.json", "b.json"]);
    }
}
