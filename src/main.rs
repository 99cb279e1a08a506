use anyhow::Result;
use clap::Parser;
use console::Style;

use genboard::cli::Cli;
use genboard::commands::{self, Session};
use genboard::config::GenboardConfig;
use genboard::logging;

async fn run(cli: Cli) -> Result<()> {
    let mut config = GenboardConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.base_url, cli.api_version);
    config.validate()?;
    tracing::debug!(base_url = %config.base_url, api_version = %config.api_version, "configuration loaded");

    let api = commands::connect(&config)?;
    Session::new(api, config, cli.json).run(cli.command).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{} {err:#}", Style::new().red().bold().apply_to("error:"));
        std::process::exit(1);
    }
}
