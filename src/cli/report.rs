use crate::core::{DownloadError, ProgressReporter, VideoMetadata};
use std::fmt::Display;
use std::path::Path;

/// Prints batch progress and per-video metadata to the terminal.
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn batch_started(&self, total: usize) {
        println!("📋 Found {} links to process\n", total);
    }

    fn item_started(&self, index: usize, total: usize, url: &str) {
        println!("\n🔄 Processing link {}/{}", index, total);
        println!("🔗 URL: {}", url);
    }

    fn metadata(&self, metadata: &VideoMetadata) {
        println!("{}", render_metadata(metadata));
    }

    fn downloaded(&self, path: &Path) {
        let name = path.file_name().unwrap_or(path.as_os_str());
        println!("✅ Video downloaded successfully: {}", name.to_string_lossy());
    }

    fn item_failed(&self, url: &str, error: &DownloadError) {
        eprintln!("❌ Failed to process {}: {}", url, error);
    }
}

fn or_unknown<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn count(value: Option<u64>) -> String {
    value.map(group_thousands).unwrap_or_else(|| "unknown".to_string())
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn render_metadata(metadata: &VideoMetadata) -> String {
    let mut lines = vec![
        "📊 Video Metadata:".to_string(),
        "==================".to_string(),
        format!("🆔 Video ID: {}", metadata.id),
        format!("📝 Description: {}", or_unknown(&metadata.description)),
        format!("⏰ Created: {}", or_unknown(&metadata.create_time)),
        String::new(),
        "👤 Author Info:".to_string(),
        format!("   Username: @{}", or_unknown(&metadata.author.username)),
        format!("   Nickname: {}", or_unknown(&metadata.author.nickname)),
        String::new(),
        "📈 Stats:".to_string(),
        format!("   👁️ Views: {}", count(metadata.stats.plays)),
        format!("   ❤️ Likes: {}", count(metadata.stats.likes)),
        format!("   💬 Comments: {}", count(metadata.stats.comments)),
        format!("   🔄 Shares: {}", count(metadata.stats.shares)),
        String::new(),
        "🎵 Music:".to_string(),
        format!("   Title: {}", or_unknown(&metadata.music.title)),
        format!("   Author: {}", or_unknown(&metadata.music.author)),
    ];

    if !metadata.hashtags.is_empty() {
        let tags: Vec<String> = metadata.hashtags.iter().map(|t| format!("#{}", t)).collect();
        lines.push(String::new());
        lines.push("🏷️ Hashtags:".to_string());
        lines.push(format!("   {}", tags.join(", ")));
    }

    lines.push(String::new());
    lines.push("🎬 Video Info:".to_string());
    lines.push(format!("   Duration: {}s", or_unknown(&metadata.video.duration)));
    lines.push(format!(
        "   Resolution: {}x{}",
        or_unknown(&metadata.video.width),
        or_unknown(&metadata.video.height)
    ));

    lines.join("\n")
}
