use crate::core::error::{DownloadError, DownloadResult};
use crate::core::RawProviderRecord;
use crate::utils::output_file_name;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

type StreamError = Box<dyn std::error::Error + Send + Sync>;

/// Which playback URL to try first when a record carries both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MediaPreference {
    /// `hdplay`, falling back to `play`.
    #[default]
    Hd,
    /// `play`, falling back to `hdplay`.
    Standard,
}

pub struct Downloader {
    client: reqwest::Client,
    download_dir: PathBuf,
    preference: MediaPreference,
}

impl Downloader {
    pub fn new(client: reqwest::Client, download_dir: impl Into<PathBuf>, preference: MediaPreference) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
            preference,
        }
    }

    pub fn select_media_url(raw: &RawProviderRecord, preference: MediaPreference) -> DownloadResult<String> {
        let (first, second) = match preference {
            MediaPreference::Hd => (raw.hd_play_url(), raw.play_url()),
            MediaPreference::Standard => (raw.play_url(), raw.hd_play_url()),
        };

        first.or(second).ok_or(DownloadError::NoMediaUrl)
    }

    /// Streams the video for `raw` into the download directory and returns the path
    /// written. A failed transfer removes whatever was written so far.
    pub async fn retrieve(&self, raw: &RawProviderRecord) -> DownloadResult<PathBuf> {
        let media_url = Self::select_media_url(raw, self.preference)?;

        tokio::fs::create_dir_all(&self.download_dir).await?;

        info!("Downloading video {}", raw.id());
        debug!("Media URL: {}", media_url);

        let response = self
            .client
            .get(&media_url)
            .header("Accept", "*/*")
            .send()
            .await?
            .error_for_status()?;

        let file_name = output_file_name(raw.title().as_deref(), raw.id());
        let output_path = self.download_dir.join(file_name);

        match self.stream_to_file(response, &output_path).await {
            Ok(bytes) => {
                info!("Downloaded {} bytes to: {}", bytes, output_path.display());
                Ok(output_path)
            }
            Err(source) => {
                if let Err(e) = tokio::fs::remove_file(&output_path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove partial file {}: {}", output_path.display(), e);
                    }
                }
                Err(DownloadError::Download {
                    path: output_path,
                    source,
                })
            }
        }
    }

    async fn stream_to_file(&self, response: reqwest::Response, output_path: &Path) -> Result<u64, StreamError> {
        let total_size = response.content_length();
        let mut file = File::create(output_path).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;

        if let Some(total) = total_size {
            if downloaded < total {
                return Err(format!("stream ended after {} of {} bytes", downloaded, total).into());
            }
        }

        Ok(downloaded)
    }
}
