use super::args::*;

pub mod attention;
pub mod compare;
pub mod ddl;
pub mod freeform;
pub mod inspect;
pub mod manifest;
pub mod run_query;
pub mod summary;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.config;
    match cli.cmd {
        Command::Summary(args) => summary::run(args, &config).await,
        Command::Inspect(args) => inspect::run(args, &config).await,
        Command::Compare(args) => compare::run(args, &config).await,
        Command::Attention(args) => attention::run(args, &config).await,
        Command::RunQuery(args) => run_query::run(args, &config).await,
        Command::Ddl(args) => ddl::run(args, &config).await,
        Command::Freeform(args) => freeform::run(args, &config).await,
        Command::Manifest(args) => manifest::run(args, &config),
    }
}
