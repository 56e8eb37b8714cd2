use std::path::Path;

use evalviz_core::providers::QueryRequest;
use evalviz_core::results::{present, Presented, NO_RESULTS};

use crate::cli::args::{OutputFormat, RunQueryArgs};
use crate::cli::helpers::{build_client, load_config, print_json};
use crate::exit_codes::{EXIT_LOOKUP_FAILED, EXIT_SUCCESS};

pub async fn run(args: RunQueryArgs, config_path: &Path) -> anyhow::Result<i32> {
    let cfg = load_config(config_path)?;
    let client = build_client(&cfg)?;
    let request = QueryRequest::new(&args.query, &args.db_type, &args.db_name);
    let presented = present(&client.run_query(&request).await?);

    if args.format == OutputFormat::Json {
        print_json(&presented)?;
    } else {
        match &presented {
            Presented::Table(table) => println!("{}", table.to_text()),
            Presented::NoResults => println!("{NO_RESULTS}"),
            Presented::Error { message } => println!("Error: {message}"),
        }
    }

    Ok(match presented {
        Presented::Error { .. } => EXIT_LOOKUP_FAILED,
        _ => EXIT_SUCCESS,
    })
}
