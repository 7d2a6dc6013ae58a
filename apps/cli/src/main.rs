mod cli;
mod commands;
mod table;

use anyhow::Context as _;
use clap::Parser;
use cli::Cli;
use commands::Context;
use feast::kernel::config::{cli_config_path, load_cli_properties};
use feast_logger::{LevelFilter, LogFormat, Logger};
use tracing::error;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let rt = feast_runtime::build_runtime_with_config(&cli.command.runtime())?;
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let properties_path = cli_config_path();
    let properties = load_cli_properties(&properties_path).context("Critical: CLI properties are malformed")?;

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else if cli.quiet {
        LevelFilter::ERROR
    } else {
        properties.log_level.as_deref().and_then(|l| l.parse().ok()).unwrap_or(LevelFilter::INFO)
    };
    let format = properties.log_format.as_deref().map(str::parse::<LogFormat>).transpose()?.unwrap_or_default();
    let _log = Logger::builder().name(env!("CARGO_PKG_NAME")).level(level).format(format).init()?;

    let ctx = Context::new(properties, properties_path, cli.repo.clone());
    commands::run(cli, ctx).await.inspect_err(|err| error!("{err:#}"))
}
