pub mod batch;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod metadata;

pub use batch::{BatchProcessor, BatchSummary, FailureLog, ItemOutcome, ItemStage, ProgressReporter};
pub use downloader::{Downloader, MediaPreference};
pub use error::{DownloadError, DownloadResult};
pub use extractor::Extractor;
pub use metadata::{normalize, MetadataStore, RawProviderRecord, VideoMetadata};
