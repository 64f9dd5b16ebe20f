use crate::core::error::{DownloadError, DownloadResult};
use crate::core::MediaPreference;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "tiktok-dl.toml";
pub const DEFAULT_API_ENDPOINT: &str = "https://www.tikwm.com/api/";

/// Runtime settings. Relative paths are resolved against `base_dir`, so a test can
/// point a whole run at a temporary directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub links_file: PathBuf,
    pub failed_log: PathBuf,
    pub api_endpoint: Url,
    pub user_agent: String,
    /// Seconds allowed for establishing a connection. Transfers themselves are unbounded.
    pub connect_timeout: u64,
    /// Pause after each successfully processed link.
    pub item_delay_ms: u64,
    pub media_preference: MediaPreference,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            downloads_dir: PathBuf::from("downloads"),
            metadata_dir: PathBuf::from("metadata"),
            links_file: PathBuf::from("links.txt"),
            failed_log: PathBuf::from("failed.txt"),
            api_endpoint: Url::parse(DEFAULT_API_ENDPOINT).expect("default endpoint is valid"),
            user_agent: format!("tiktok-dl/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: 30,
            item_delay_ms: 1000,
            media_preference: MediaPreference::default(),
        }
    }
}

impl Config {
    /// Loads settings from `path`, or from `tiktok-dl.toml` in the working directory
    /// when no path is given and that file exists. Falls back to defaults otherwise.
    pub fn load(path: Option<&Path>) -> DownloadResult<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(DownloadError::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                Self::from_file(path)
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> DownloadResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DownloadError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> DownloadResult<Self> {
        toml::from_str(raw).map_err(|e| DownloadError::Config(e.to_string()))
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn downloads_path(&self) -> PathBuf {
        self.resolve(&self.downloads_dir)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.resolve(&self.metadata_dir)
    }

    pub fn links_path(&self) -> PathBuf {
        self.resolve(&self.links_file)
    }

    pub fn failed_log_path(&self) -> PathBuf {
        self.resolve(&self.failed_log)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_resolve_against_base_dir() {
        let config = Config::default().with_base_dir("/tmp/run");
        assert_eq!(config.links_path(), PathBuf::from("/tmp/run/links.txt"));
        assert_eq!(config.downloads_path(), PathBuf::from("/tmp/run/downloads"));
        assert_eq!(config.metadata_path(), PathBuf::from("/tmp/run/metadata"));
        assert_eq!(config.failed_log_path(), PathBuf::from("/tmp/run/failed.txt"));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let mut config = Config::default().with_base_dir("/tmp/run");
        config.failed_log = PathBuf::from("/var/log/failed.txt");
        assert_eq!(config.failed_log_path(), PathBuf::from("/var/log/failed.txt"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            links_file = "queue.txt"
            item_delay_ms = 0
            media_preference = "standard"
            "#,
        )
        .unwrap();

        assert_eq!(config.links_file, PathBuf::from("queue.txt"));
        assert_eq!(config.item_delay(), Duration::ZERO);
        assert_eq!(config.media_preference, MediaPreference::Standard);
        assert_eq!(config.api_endpoint.as_str(), DEFAULT_API_ENDPOINT);
        assert_eq!(config.downloads_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("api_endpoint = \"not a url\"").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, DownloadError::Config(_)));
    }
}
