use crate::config::Config;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Longest sanitized stem (in characters) used for a downloaded file name.
pub const MAX_FILENAME_CHARS: usize = 100;

/// Byte cap for a sanitized stem, leaving room for the extension under the 255-byte
/// name limit of common filesystems.
pub const MAX_FILENAME_BYTES: usize = 240;

pub const VIDEO_EXTENSION: &str = "mp4";

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/video/(\d+)").expect("video id pattern is valid"))
}

/// Pulls the numeric video id out of a TikTok link such as
/// `https://www.tiktok.com/@user/video/7234567890123456789?lang=en`.
pub fn extract_video_id(url: &str) -> Option<String> {
    video_id_pattern()
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn sanitize_filename(filename: &str) -> String {
    let mut out = String::new();

    // Strip characters that are invalid in filenames on any major platform
    let allowed = filename
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .take(MAX_FILENAME_CHARS);

    for c in allowed {
        if out.len() + c.len_utf8() > MAX_FILENAME_BYTES {
            break;
        }
        out.push(c);
    }

    out
}

/// File name for a downloaded video: the sanitized description, or the id when the
/// description is missing or sanitizes down to nothing.
pub fn output_file_name(description: Option<&str>, id: &str) -> String {
    let stem = description
        .map(sanitize_filename)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| sanitize_filename(id));

    format!("{}.{}", stem, VIDEO_EXTENSION)
}

pub fn build_http_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}
