use std::path::Path;

use evalviz_core::report::console::{grid_line, summary_lines};
use evalviz_core::report::{dataset_digest, write_summary, Provenance, Summary};
use tracing::info;

use crate::cli::args::{OutputFormat, SummaryArgs};
use crate::cli::helpers::{
    build_client, load_config, load_dataset, open_session, print_json, print_lines,
};
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: SummaryArgs, config_path: &Path) -> anyhow::Result<i32> {
    let cfg = load_config(config_path)?;
    let client = build_client(&cfg)?;
    let dataset = load_dataset(&client, &args.dataset).await?;

    let provenance = Provenance::new(env!("CARGO_PKG_VERSION"), &dataset.id)
        .with_digest(Some(dataset_digest(dataset.raw.as_bytes())));
    let session = open_session(dataset, &args.filter, &cfg);
    let ws = session.working_set();
    let summary =
        Summary::from_working_set(ws, provenance.with_filters(session.filters()));

    if let Some(out) = &args.out {
        write_summary(&summary, out)?;
        info!(path = %out.display(), "summary written");
    }

    match args.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            print_lines(&summary_lines(ws));
            if args.grid {
                for category in &ws.categories {
                    println!("{category:<24} {}", grid_line(ws, category));
                }
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
