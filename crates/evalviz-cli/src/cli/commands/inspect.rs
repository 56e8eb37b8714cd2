use std::path::Path;

use anyhow::Context;
use evalviz_core::logprobs::TokenDetail;
use evalviz_core::reference::ReferenceKind;
use evalviz_core::report::console::{record_lines, token_trace_lines};
use evalviz_core::results::{present, Presented, NO_RESULTS};
use evalviz_core::slot::SlotState;
use evalviz_core::QueryKind;
use serde_json::json;

use crate::cli::args::{InspectArgs, OutputFormat, RunTarget};
use crate::cli::helpers::{
    build_client, load_config, load_dataset, open_session, print_json, print_lines,
};
use crate::exit_codes::{EXIT_LOOKUP_FAILED, EXIT_SUCCESS};

impl RunTarget {
    fn kind(self) -> QueryKind {
        match self {
            RunTarget::Golden => QueryKind::Golden,
            RunTarget::Generated => QueryKind::Generated,
            RunTarget::PostgresGolden => QueryKind::PostgresGolden,
        }
    }

    fn label(self) -> &'static str {
        match self {
            RunTarget::Golden => "golden",
            RunTarget::Generated => "generated",
            RunTarget::PostgresGolden => "postgres_golden",
        }
    }
}

pub async fn run(args: InspectArgs, config_path: &Path) -> anyhow::Result<i32> {
    let cfg = load_config(config_path)?;
    let client = build_client(&cfg)?;
    let dataset = load_dataset(&client, &args.dataset).await?;
    let dataset_id = dataset.id.clone();
    let mut session = open_session(dataset, &args.filter, &cfg);

    if !session.select(&args.record.db_name, &args.record.question) {
        eprintln!(
            "no record for {}/{:?} in the filtered working set",
            args.record.db_name, args.record.question
        );
        return Ok(EXIT_LOOKUP_FAILED);
    }

    if args.runs.contains(&RunTarget::PostgresGolden) {
        ReferenceKind::for_dataset(&dataset_id).context("postgres golden run")?;
    }

    let mut runs = Vec::new();
    let mut failed = false;
    for target in &args.runs {
        let presented = match session.run_query(&client, target.kind()).await {
            SlotState::Ready(outcome) => present(outcome),
            SlotState::Failed(message) => {
                failed = true;
                Presented::Error {
                    message: message.clone(),
                }
            }
            SlotState::Idle | SlotState::Pending => continue,
        };
        if matches!(presented, Presented::Error { .. }) {
            failed = true;
        }
        runs.push((*target, presented));
    }

    let Some(record) = session.selected() else {
        return Ok(EXIT_LOOKUP_FAILED);
    };
    let trace = session.token_trace();

    match args.format {
        OutputFormat::Json => {
            let mut run_map = serde_json::Map::new();
            for (target, presented) in &runs {
                run_map.insert(target.label().to_string(), serde_json::to_value(presented)?);
            }
            let tokens: Vec<TokenDetail> = trace.iter().map(TokenDetail::from_step).collect();
            print_json(&json!({
                "record": record,
                "tokens": tokens,
                "runs": run_map,
            }))?;
        }
        OutputFormat::Text => {
            print_lines(&record_lines(record));
            if args.tokens {
                println!();
                println!("Token confidence:");
                print_lines(&token_trace_lines(&trace));
            }
            for (target, presented) in &runs {
                println!();
                println!("== {} ==", target.label());
                match presented {
                    Presented::Table(table) => println!("{}", table.to_text()),
                    Presented::NoResults => println!("{NO_RESULTS}"),
                    Presented::Error { message } => println!("Error: {message}"),
                }
            }
        }
    }

    Ok(if failed { EXIT_LOOKUP_FAILED } else { EXIT_SUCCESS })
}
