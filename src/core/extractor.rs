use crate::core::error::DownloadResult;
use crate::core::RawProviderRecord;
use crate::utils::extract_video_id;
use async_trait::async_trait;

/// Resolves a public video link into the provider's raw record for that video.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the link looks like something this extractor can resolve. Checked
    /// before any network call is made.
    fn suitable(&self, url: &str) -> bool {
        extract_video_id(url).is_some()
    }

    async fn extract(&self, url: &str) -> DownloadResult<RawProviderRecord>;
}
