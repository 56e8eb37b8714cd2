use std::path::Path;

use evalviz_core::compare::{compare_categories, diverging_questions};
use evalviz_core::report::console::comparison_lines;
use serde_json::json;

use crate::cli::args::{CompareArgs, OutputFormat};
use crate::cli::helpers::{
    build_client, load_config, load_dataset_arg, open_session, print_json, print_lines,
};
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: CompareArgs, config_path: &Path) -> anyhow::Result<i32> {
    let cfg = load_config(config_path)?;
    let client = build_client(&cfg)?;
    let left = load_dataset_arg(&client, &args.left).await?;
    let right = load_dataset_arg(&client, &args.right).await?;
    let (left_id, right_id) = (left.id.clone(), right.id.clone());

    let left = open_session(left, &args.filter, &cfg);
    let right = open_session(right, &args.filter, &cfg);
    let rows = compare_categories(left.working_set(), right.working_set());
    let diffs = if args.questions {
        diverging_questions(left.working_set(), right.working_set())
    } else {
        Vec::new()
    };

    match args.format {
        OutputFormat::Json => {
            let categories: Vec<_> = rows
                .iter()
                .map(|c| {
                    json!({
                        "category": c.category,
                        "left": c.left,
                        "right": c.right,
                        "delta": c.delta(),
                    })
                })
                .collect();
            print_json(&json!({
                "left": left_id,
                "right": right_id,
                "categories": categories,
                "questions": diffs,
            }))?;
        }
        OutputFormat::Text => {
            println!("{:<24} {:>7}  {:>7}", "category", "left", "right");
            print_lines(&comparison_lines(&rows, &diffs));
        }
    }
    Ok(EXIT_SUCCESS)
}
