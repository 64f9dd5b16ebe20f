use std::path::PathBuf;

/// Everything that can go wrong while turning one link into a file on disk.
///
/// Only [`DownloadError::LinksFileMissing`] and [`DownloadError::Config`] are fatal for a
/// run; every other variant is scoped to the single link that produced it.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Invalid TikTok URL")]
    InvalidUrl,

    #[error("Failed to get video information")]
    Provider {
        code: Option<i64>,
        message: Option<String>,
    },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("No media URL available for video")]
    NoMediaUrl,

    #[error("Download error writing {}: {source}", .path.display())]
    Download {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("IO error: {0}")]
    Persist(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{} file not found!", .path.display())]
    LinksFileMissing { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DownloadError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DownloadError::LinksFileMissing { .. } | DownloadError::Config(_)
        )
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
