pub mod cli;
pub mod config;
pub mod core;
pub mod extractors;
pub mod utils;

pub use config::Config;
pub use core::{BatchProcessor, DownloadError, Downloader, Extractor, RawProviderRecord, VideoMetadata};
pub use extractors::TikwmExtractor;
