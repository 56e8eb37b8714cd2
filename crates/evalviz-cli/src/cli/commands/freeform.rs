use std::path::Path;

use anyhow::Context;
use evalviz_core::ddl::render_ddl;
use evalviz_core::logprobs::{normalize, TokenDetail};
use evalviz_core::report::console::token_trace_lines;
use evalviz_core::sql_format::format_sql_text;
use serde_json::json;

use crate::cli::args::{FreeformArgs, OutputFormat};
use crate::cli::helpers::{build_client, load_config, print_json, print_lines};
use crate::exit_codes::EXIT_SUCCESS;

const METADATA_PLACEHOLDER: &str = "{table_metadata_string}";

/// Puts the DDL where the prompt asks for it, or in front of the prompt.
fn fill_metadata(prompt: &str, ddl: &str) -> String {
    if prompt.contains(METADATA_PLACEHOLDER) {
        prompt.replace(METADATA_PLACEHOLDER, ddl)
    } else {
        format!("{ddl}\n\n{prompt}")
    }
}

pub async fn run(args: FreeformArgs, config_path: &Path) -> anyhow::Result<i32> {
    let cfg = load_config(config_path)?;
    let client = build_client(&cfg)?;

    let mut prompt = match (&args.prompt, &args.prompt_file) {
        (Some(p), _) => p.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading prompt {}", path.display()))?,
        (None, None) => anyhow::bail!("either --prompt or --prompt-file is required"),
    };
    if let Some(key) = &args.api_key {
        let meta = client.fetch_metadata(key).await?;
        prompt = fill_metadata(&prompt, &render_ddl(&meta));
    }

    let completion = client.complete_freeform(&args.url, &prompt).await?;
    let trace = normalize(&completion.logprobs);

    match args.format {
        OutputFormat::Json => {
            let tokens: Vec<TokenDetail> = trace.iter().map(TokenDetail::from_step).collect();
            print_json(&json!({
                "text": completion.first_text(),
                "tokens": tokens,
            }))?;
        }
        OutputFormat::Text => {
            println!("Query:");
            println!("{}", format_sql_text(completion.first_text()));
            println!();
            println!("Token confidence:");
            print_lines(&token_trace_lines(&trace));
        }
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_replaces_placeholder() {
        let filled = fill_metadata("schema:\n{table_metadata_string}\nq?", "CREATE TABLE t ();");
        assert_eq!(filled, "schema:\nCREATE TABLE t ();\nq?");
    }

    #[test]
    fn metadata_is_prepended_without_placeholder() {
        assert_eq!(fill_metadata("q?", "DDL"), "DDL\n\nq?");
    }
}
