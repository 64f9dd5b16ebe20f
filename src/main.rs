use clap::Parser;
use tracing::{info, Level};

use tiktok_dl::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    info!("Starting tiktok-dl v{}", env!("CARGO_PKG_VERSION"));

    cli.run().await?;

    Ok(())
}
