use std::path::Path;

use evalviz_core::report::console::attention_lines;
use evalviz_core::slot::SlotState;
use serde_json::json;

use crate::cli::args::{AttentionArgs, FilterArgs, OutputFormat};
use crate::cli::helpers::{
    build_client, load_config, load_dataset, open_session, print_json, print_lines,
};
use crate::exit_codes::{EXIT_LOOKUP_FAILED, EXIT_SUCCESS};

pub async fn run(args: AttentionArgs, config_path: &Path) -> anyhow::Result<i32> {
    let cfg = load_config(config_path)?;
    let client = build_client(&cfg)?;
    let dataset = load_dataset(&client, &args.dataset).await?;
    let mut session = open_session(dataset, &FilterArgs::default(), &cfg);

    if !session.select(&args.record.db_name, &args.record.question) {
        eprintln!(
            "no record for {}/{:?}",
            args.record.db_name, args.record.question
        );
        return Ok(EXIT_LOOKUP_FAILED);
    }

    let model = args
        .model_name
        .as_deref()
        .unwrap_or(&cfg.attention.model_name);
    if !session.load_attention(&client, model).await {
        match session.attention_state() {
            SlotState::Failed(message) => eprintln!("attention unavailable: {message}"),
            _ => eprintln!("record has no prompt to replay"),
        }
        return Ok(EXIT_LOOKUP_FAILED);
    }

    let replay = session.replay_mut();
    let steps: Vec<i64> = if args.all {
        (0..replay.step_count() as i64).collect()
    } else {
        vec![args.step]
    };

    let mut frames = Vec::new();
    for requested in steps {
        replay.set_step(requested);
        match args.format {
            OutputFormat::Json => frames.push(json!({
                "step": replay.step(),
                "step_count": replay.step_count(),
                "token": replay.current_token(),
                "cells": replay.current_cells(),
            })),
            OutputFormat::Text => print_lines(&attention_lines(replay)),
        }
    }
    if args.format == OutputFormat::Json {
        print_json(&frames)?;
    }
    Ok(EXIT_SUCCESS)
}
