mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Boot => commands::boot(cli.settings).await,
        Command::Listings {
            location,
            kind,
            min_price,
            max_price,
            amenities,
        } => commands::listings(cli.settings, location, kind, min_price, max_price, amenities).await,
        Command::Status { output } => commands::status(cli.settings, output).await,
    }
}
