use std::path::Path;

use evalviz_core::ddl::render_ddl;

use crate::cli::args::DdlArgs;
use crate::cli::helpers::{build_client, load_config};
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: DdlArgs, config_path: &Path) -> anyhow::Result<i32> {
    let cfg = load_config(config_path)?;
    let client = build_client(&cfg)?;
    let meta = client.fetch_metadata(&args.api_key).await?;
    println!("{}", render_ddl(&meta));
    Ok(EXIT_SUCCESS)
}
