use crate::config::Config;
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::metadata::{normalize, MetadataStore, VideoMetadata};
use crate::core::{Downloader, Extractor};
use crate::extractors::TikwmExtractor;
use crate::utils::build_http_client;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// Hooks for surfacing batch progress to a user. Every method defaults to a no-op.
pub trait ProgressReporter: Send + Sync {
    fn batch_started(&self, _total: usize) {}
    fn item_started(&self, _index: usize, _total: usize, _url: &str) {}
    fn metadata(&self, _metadata: &VideoMetadata) {}
    fn downloaded(&self, _path: &Path) {}
    fn item_failed(&self, _url: &str, _error: &DownloadError) {}
}

pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Where a link was in the pipeline. A failure at any stage ends that link only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    Pending,
    Fetching,
    Normalizing,
    Downloading,
    Persisting,
    Done,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStage::Pending => "pending",
            ItemStage::Fetching => "fetching",
            ItemStage::Normalizing => "normalizing",
            ItemStage::Downloading => "downloading",
            ItemStage::Persisting => "persisting",
            ItemStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub url: String,
    pub metadata: VideoMetadata,
    pub video_path: PathBuf,
    pub metadata_path: PathBuf,
}

#[derive(Debug)]
pub struct FailedItem {
    pub url: String,
    pub stage: ItemStage,
    pub error: DownloadError,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: Vec<ItemOutcome>,
    pub failed: Vec<FailedItem>,
}

/// Append-only `failed.txt`: one `<url> - Error: <message>` line per failed link.
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry(url: &str, error: &DownloadError) -> String {
        format!("{} - Error: {}\n", url, error)
    }

    pub async fn append(&self, url: &str, error: &DownloadError) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        // Single write per entry so lines never interleave.
        file.write_all(Self::entry(url, error).as_bytes()).await?;
        file.flush().await
    }
}

/// Splits a links file into trimmed, non-blank lines.
pub fn parse_links(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Drives links through fetch, normalize, download and persist, one at a time.
pub struct BatchProcessor {
    config: Config,
    extractor: Box<dyn Extractor>,
    downloader: Downloader,
    store: MetadataStore,
    failure_log: FailureLog,
    reporter: Box<dyn ProgressReporter>,
}

impl BatchProcessor {
    pub fn new(config: Config) -> DownloadResult<Self> {
        let client = build_http_client(&config)
            .map_err(|e| DownloadError::Config(format!("failed to create HTTP client: {}", e)))?;

        let extractor = TikwmExtractor::new(client.clone(), config.api_endpoint.clone());
        let downloader = Downloader::new(client, config.downloads_path(), config.media_preference);

        Ok(Self {
            store: MetadataStore::new(config.metadata_path()),
            failure_log: FailureLog::new(config.failed_log_path()),
            extractor: Box::new(extractor),
            downloader,
            reporter: Box::new(SilentReporter),
            config,
        })
    }

    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Processes every link in the configured links file. A missing or unreadable links
    /// file, or a fatal error raised while handling a link, ends the run with an error;
    /// any other link failure is logged and skipped.
    pub async fn process_links(&self) -> DownloadResult<BatchSummary> {
        let links_path = self.config.links_path();
        if !tokio::fs::try_exists(&links_path).await.unwrap_or(false) {
            return Err(DownloadError::LinksFileMissing { path: links_path });
        }

        let contents = tokio::fs::read_to_string(&links_path).await?;
        let links = parse_links(&contents);
        let total = links.len();

        info!("Found {} links to process", total);
        self.reporter.batch_started(total);

        let delay = self.config.item_delay();
        let mut summary = BatchSummary {
            total,
            ..Default::default()
        };

        for (index, url) in links.into_iter().enumerate() {
            info!("Processing link {}/{}: {}", index + 1, total, url);
            self.reporter.item_started(index + 1, total, &url);

            match self.run_item(&url).await {
                Ok(outcome) => {
                    summary.completed.push(outcome);
                    pause(delay).await;
                }
                Err((stage, error)) if error.is_fatal() => {
                    error!("Aborting batch at {} while {}: {}", url, stage, error);
                    return Err(error);
                }
                Err((stage, error)) => {
                    error!("Failed to process {} while {}: {}", url, stage, error);
                    self.reporter.item_failed(&url, &error);
                    if let Err(e) = self.failure_log.append(&url, &error).await {
                        warn!(
                            "Could not record failure in {}: {}",
                            self.failure_log.path().display(),
                            e
                        );
                    }
                    summary.failed.push(FailedItem { url, stage, error });
                }
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed",
            summary.completed.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Runs the full pipeline for a single link without touching the failure log.
    pub async fn process_one(&self, url: &str) -> DownloadResult<ItemOutcome> {
        self.run_item(url.trim()).await.map_err(|(_, error)| error)
    }

    async fn run_item(&self, url: &str) -> Result<ItemOutcome, (ItemStage, DownloadError)> {
        let mut stage = ItemStage::Pending;
        let mut advance = |next: ItemStage| {
            debug!("{}: {} -> {}", url, stage, next);
            stage = next;
            next
        };

        let at = advance(ItemStage::Fetching);
        debug!("Resolving {} with {} extractor", url, self.extractor.name());
        let raw = self.extractor.extract(url).await.map_err(|e| (at, e))?;

        advance(ItemStage::Normalizing);
        let metadata = normalize(&raw);
        self.reporter.metadata(&metadata);

        let at = advance(ItemStage::Downloading);
        let video_path = self.downloader.retrieve(&raw).await.map_err(|e| (at, e))?;
        self.reporter.downloaded(&video_path);

        let at = advance(ItemStage::Persisting);
        let metadata_path = self.store.save(&metadata, url).await.map_err(|e| (at, e))?;

        advance(ItemStage::Done);
        Ok(ItemOutcome {
            url: url.to_string(),
            metadata,
            video_path,
            metadata_path,
        })
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_links_skips_blank_lines() {
        let links = parse_links("https://a/video/1\n\n   \r\n  https://b/video/2  \r\nnot-a-link\n");
        assert_eq!(links, vec!["https://a/video/1", "https://b/video/2", "not-a-link"]);
        assert!(parse_links("").is_empty());
    }

    #[test]
    fn test_failure_log_entry_format() {
        assert_eq!(
            FailureLog::entry("https://bad/link", &DownloadError::InvalidUrl),
            "https://bad/link - Error: Invalid TikTok URL\n"
        );
    }

    #[tokio::test]
    async fn test_failure_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = FailureLog::new(dir.path().join("logs").join("failed.txt"));

        log.append("one", &DownloadError::InvalidUrl).await.unwrap();
        log.append("two", &DownloadError::NoMediaUrl).await.unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            contents,
            "one - Error: Invalid TikTok URL\ntwo - Error: No media URL available for video\n"
        );
    }
}
