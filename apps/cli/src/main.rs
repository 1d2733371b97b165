//! whguide CLI: keeps the wormhole guide workbook up to date.
//!
//! Refreshes dogma attributes from ESI and market aggregates from Fuzzwork,
//! then stamps the update time. Meant to be run from cron or a systemd timer.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
