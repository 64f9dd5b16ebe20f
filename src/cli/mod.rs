mod report;

pub use report::{group_thousands, render_metadata, ConsoleReporter};

use crate::config::Config;
use crate::core::{BatchProcessor, MediaPreference};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tiktok-dl")]
#[command(about = "Download TikTok videos and their metadata, one link or a whole list")]
#[command(version)]
pub struct Cli {
    /// Video URL to download. Without it every link in the links file is processed
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Directory that downloads/, metadata/, links.txt and failed.txt live in
    #[arg(short = 'd', long)]
    pub base_dir: Option<PathBuf>,

    /// Links file, one URL per line
    #[arg(short, long)]
    pub links: Option<PathBuf>,

    /// TOML config file (defaults to ./tiktok-dl.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Which media URL to try first
    #[arg(short, long, value_enum)]
    pub prefer: Option<MediaPreference>,

    /// Pause after each successful download, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file values with command line overrides applied on top.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(base_dir) = &self.base_dir {
            config.base_dir = base_dir.clone();
        }
        if let Some(links) = &self.links {
            config.links_file = links.clone();
        }
        if let Some(prefer) = self.prefer {
            config.media_preference = prefer;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.item_delay_ms = delay_ms;
        }

        Ok(config)
    }

    pub async fn run(&self) -> Result<()> {
        let config = self.resolve_config()?;
        let processor = BatchProcessor::new(config)?.with_reporter(Box::new(ConsoleReporter));

        match &self.url {
            Some(url) => {
                println!("\n📱 Fetching TikTok video metadata...\n");
                let outcome = processor
                    .process_one(url)
                    .await
                    .with_context(|| format!("Failed to process {}", url))?;

                println!("\n✅ Download Complete!");
                println!("📁 File saved:");
                println!("   Path: {}", outcome.video_path.display());
                println!("   Metadata: {}", outcome.metadata_path.display());
            }
            None => {
                let summary = processor.process_links().await?;

                println!(
                    "\n🏁 Done: {} of {} downloaded, {} failed",
                    summary.completed.len(),
                    summary.total,
                    summary.failed.len()
                );
                if !summary.failed.is_empty() {
                    println!(
                        "   Failures recorded in {}",
                        processor.config().failed_log_path().display()
                    );
                }
            }
        }

        Ok(())
    }
}
