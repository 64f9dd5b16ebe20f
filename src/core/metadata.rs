use crate::core::error::{DownloadError, DownloadResult};
use crate::utils::sanitize_filename;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::debug;

/// The `data` object returned by the provider for one video, kept as loose JSON.
///
/// The only field guaranteed to exist is `id`; everything else is read on demand and
/// may be missing or of an unexpected type.
#[derive(Debug, Clone)]
pub struct RawProviderRecord {
    id: String,
    data: Value,
}

impl RawProviderRecord {
    pub fn from_value(data: Value) -> DownloadResult<Self> {
        if !data.is_object() {
            return Err(DownloadError::Provider {
                code: None,
                message: Some("response data is not an object".to_string()),
            });
        }

        let id = data
            .get("id")
            .and_then(value_to_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DownloadError::Provider {
                code: None,
                message: Some("response data has no video id".to_string()),
            })?;

        Ok(Self { id, data })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> Option<String> {
        self.string(&["title"])
    }

    /// Standard playback URL (`play`).
    pub fn play_url(&self) -> Option<String> {
        self.string(&["play"]).filter(|s| !s.is_empty())
    }

    /// HD playback URL (`hdplay`).
    pub fn hd_play_url(&self) -> Option<String> {
        self.string(&["hdplay"]).filter(|s| !s.is_empty())
    }

    fn lookup(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.data, |value, key| value.get(key))
            .filter(|value| !value.is_null())
    }

    fn string(&self, path: &[&str]) -> Option<String> {
        self.lookup(path).and_then(value_to_string)
    }

    fn unsigned(&self, path: &[&str]) -> Option<u64> {
        self.lookup(path).and_then(|value| match value {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    fn signed(&self, path: &[&str]) -> Option<i64> {
        self.lookup(path).and_then(|value| match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    pub description: Option<String>,
    /// Human-readable local time, e.g. `3/14/2024, 9:26:53 PM`. Display only; use
    /// `create_timestamp` for anything that needs ordering.
    pub create_time: Option<String>,
    pub create_timestamp: Option<i64>,
    pub author: AuthorInfo,
    pub stats: VideoStats,
    pub video: VideoInfo,
    pub music: MusicInfo,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    pub id: Option<String>,
    pub nickname: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoStats {
    pub plays: Option<u64>,
    pub likes: Option<u64>,
    pub shares: Option<u64>,
    pub comments: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub duration: Option<u64>,
    pub original_url: Option<String>,
    pub hd_url: Option<String>,
    pub width: Option<u64>,
    pub height: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusicInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub duration: Option<u64>,
    pub url: Option<String>,
}

/// Maps a provider record onto the stable metadata schema. Never fails: any field the
/// provider left out simply comes through as `None`.
pub fn normalize(raw: &RawProviderRecord) -> VideoMetadata {
    let create_timestamp = raw.signed(&["create_time"]);

    let hashtags = raw
        .lookup(&["hashtags"])
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.get("name").and_then(value_to_string))
                .collect()
        })
        .unwrap_or_default();

    VideoMetadata {
        id: raw.id().to_string(),
        description: raw.title(),
        create_time: create_timestamp.and_then(|secs| format_create_time(secs, &Local)),
        create_timestamp,
        author: AuthorInfo {
            id: raw.string(&["author", "id"]),
            nickname: raw.string(&["author", "nickname"]),
            username: raw.string(&["author", "unique_id"]),
            avatar_url: raw.string(&["author", "avatar"]),
        },
        stats: VideoStats {
            plays: raw.unsigned(&["play_count"]),
            likes: raw.unsigned(&["digg_count"]),
            shares: raw.unsigned(&["share_count"]),
            comments: raw.unsigned(&["comment_count"]),
        },
        video: VideoInfo {
            duration: raw.unsigned(&["duration"]),
            original_url: raw.play_url(),
            hd_url: raw.hd_play_url(),
            width: raw.unsigned(&["width"]),
            height: raw.unsigned(&["height"]),
        },
        music: MusicInfo {
            title: raw.string(&["music_info", "title"]),
            author: raw.string(&["music_info", "author"]),
            duration: raw.unsigned(&["music_info", "duration"]),
            url: raw.string(&["music_info", "play"]),
        },
        hashtags,
    }
}

/// Renders epoch seconds as `M/D/YYYY, h:mm:ss AM` in the given zone.
pub fn format_create_time<Tz>(epoch_secs: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_opt(epoch_secs, 0)
        .single()
        .map(|dt| dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedMetadata<'a> {
    #[serde(flatten)]
    metadata: &'a VideoMetadata,
    source_url: &'a str,
}

/// Writes one pretty-printed `<id>.json` per video.
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename(id)))
    }

    pub async fn save(&self, metadata: &VideoMetadata, source_url: &str) -> DownloadResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let record = PersistedMetadata {
            metadata,
            source_url,
        };
        let json = serde_json::to_string_pretty(&record)?;

        let path = self.path_for(&metadata.id);
        tokio::fs::write(&path, json).await?;
        debug!("Saved metadata to {}", path.display());

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn full_record() -> RawProviderRecord {
        RawProviderRecord::from_value(json!({
            "id": "7234567890123456789",
            "title": "morning routine #fyp",
            "create_time": 1710451613,
            "play_count": 1200,
            "digg_count": 300,
            "share_count": 12,
            "comment_count": 45,
            "duration": 15,
            "play": "https://cdn.example/play.mp4",
            "hdplay": "https://cdn.example/hd.mp4",
            "width": 576,
            "height": 1024,
            "author": {
                "id": "6800000000",
                "unique_id": "scout2015",
                "nickname": "Scout",
                "avatar": "https://cdn.example/avatar.jpg"
            },
            "music_info": {
                "title": "original sound",
                "author": "Scout",
                "duration": 15,
                "play": "https://cdn.example/music.mp3"
            },
            "hashtags": [{"name": "fyp"}, {"name": "morning"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_full_record() {
        let metadata = normalize(&full_record());

        assert_eq!(metadata.id, "7234567890123456789");
        assert_eq!(metadata.description.as_deref(), Some("morning routine #fyp"));
        assert_eq!(metadata.create_timestamp, Some(1710451613));
        assert_eq!(metadata.author.username.as_deref(), Some("scout2015"));
        assert_eq!(metadata.author.avatar_url.as_deref(), Some("https://cdn.example/avatar.jpg"));
        assert_eq!(metadata.stats.plays, Some(1200));
        assert_eq!(metadata.stats.likes, Some(300));
        assert_eq!(metadata.stats.shares, Some(12));
        assert_eq!(metadata.stats.comments, Some(45));
        assert_eq!(metadata.video.hd_url.as_deref(), Some("https://cdn.example/hd.mp4"));
        assert_eq!(metadata.video.width, Some(576));
        assert_eq!(metadata.music.url.as_deref(), Some("https://cdn.example/music.mp3"));
        assert_eq!(metadata.hashtags, vec!["fyp", "morning"]);
    }

    #[test]
    fn test_normalize_tolerates_missing_nested_objects() {
        let raw = RawProviderRecord::from_value(json!({ "id": "99" })).unwrap();
        let metadata = normalize(&raw);

        assert_eq!(metadata.id, "99");
        assert_eq!(metadata.description, None);
        assert_eq!(metadata.create_time, None);
        assert_eq!(metadata.author, AuthorInfo::default());
        assert_eq!(metadata.music, MusicInfo::default());
        assert_eq!(metadata.stats, VideoStats::default());
        assert!(metadata.hashtags.is_empty());
    }

    #[test]
    fn test_normalize_tolerates_wrong_types() {
        let raw = RawProviderRecord::from_value(json!({
            "id": 12345,
            "author": "not an object",
            "music_info": null,
            "play_count": "77",
            "hashtags": {"name": "oops"}
        }))
        .unwrap();
        let metadata = normalize(&raw);

        assert_eq!(metadata.id, "12345");
        assert_eq!(metadata.author.nickname, None);
        assert_eq!(metadata.music.title, None);
        assert_eq!(metadata.stats.plays, Some(77));
        assert!(metadata.hashtags.is_empty());
    }

    #[test]
    fn test_record_requires_id() {
        assert!(RawProviderRecord::from_value(json!({ "title": "no id" })).is_err());
        assert!(RawProviderRecord::from_value(json!({ "id": "" })).is_err());
        assert!(RawProviderRecord::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_format_create_time() {
        assert_eq!(
            format_create_time(1710451613, &Utc).as_deref(),
            Some("3/14/2024, 9:26:53 PM")
        );
        assert_eq!(
            format_create_time(0, &Utc).as_deref(),
            Some("1/1/1970, 12:00:00 AM")
        );
    }

    #[test]
    fn test_persisted_json_shape() {
        let metadata = normalize(&full_record());
        let record = PersistedMetadata {
            metadata: &metadata,
            source_url: "https://www.tiktok.com/@scout2015/video/7234567890123456789",
        };
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], "7234567890123456789");
        assert_eq!(value["sourceUrl"], "https://www.tiktok.com/@scout2015/video/7234567890123456789");
        assert_eq!(value["author"]["avatarUrl"], "https://cdn.example/avatar.jpg");
        assert_eq!(value["video"]["originalUrl"], "https://cdn.example/play.mp4");
        assert_eq!(value["video"]["hdUrl"], "https://cdn.example/hd.mp4");
        assert_eq!(value["createTimestamp"], 1710451613);
        assert!(value["createTime"].is_string());
    }
}
