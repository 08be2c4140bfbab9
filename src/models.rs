//! Core data models for the media checker

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Common image extensions, checked when images are enabled
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "jpe", "png", "bmp", "gif", "pcd", "tif", "tiff", "j2k", "j2p", "j2x", "webp",
];

/// Rare image extensions, checked unless extra formats are disabled
pub const EXTRA_IMAGE_EXTENSIONS: &[&str] = &[
    "eps", "ico", "im", "pcx", "ppm", "sgi", "spider", "xbm", "tga", "psd", "xcf",
];

/// Video containers handled by ffmpeg
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "mp4", "mov", "mpeg", "mpg", "m2p", "mkv", "3gp", "ogg", "flv", "f4v", "f4p", "f4a",
    "f4b",
];

/// Audio formats handled by ffmpeg
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "mp2"];

/// Image extensions the in-process decoder understands
const DECODER_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "jpe", "png", "bmp", "gif", "tif", "tiff", "webp", "ico", "ppm", "tga",
];

/// Probe category, resolved once from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Formats the in-process decoder handles, double checked by ImageMagick
    Image,
    /// Formats only ImageMagick can read (layered, editor native, rare)
    ExtraImage,
    /// Audio and video containers decoded through ffmpeg
    AudioVideo,
}

impl Category {
    /// Infer the category from a file extension (case-insensitive, no dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        let ext = ext.as_str();
        if DECODER_EXTENSIONS.contains(&ext) {
            Some(Category::Image)
        } else if IMAGE_EXTENSIONS.contains(&ext) || EXTRA_IMAGE_EXTENSIONS.contains(&ext) {
            Some(Category::ExtraImage)
        } else if VIDEO_EXTENSIONS.contains(&ext) || AUDIO_EXTENSIONS.contains(&ext) {
            Some(Category::AudioVideo)
        } else {
            None
        }
    }

    /// Infer the category from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        extension_of(path).and_then(|ext| Self::from_extension(&ext))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::ExtraImage => "extra_image",
            Category::AudioVideo => "audio_video",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowercase text after the last `.` of the file name, if any
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// A single file scheduled for checking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Path to the file
    pub path: PathBuf,
    /// Category resolved at scan time (None: size and zero-run probes only)
    pub category: Option<Category>,
}

impl Task {
    /// Create a task, resolving the category from the extension
    pub fn new(path: PathBuf) -> Self {
        let category = Category::from_path(&path);
        Self { path, category }
    }

    /// Create a task with an explicit category
    pub fn with_category(path: PathBuf, category: Option<Category>) -> Self {
        Self { path, category }
    }
}

/// Result of checking one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Path of the checked file
    pub path: PathBuf,
    /// Failure detail, `None` when every probe passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// File size in bytes, `None` when stat failed
    pub size: Option<u64>,
}

impl Outcome {
    /// Create a passing outcome
    pub fn passed(path: PathBuf, size: Option<u64>) -> Self {
        Self {
            path,
            error: None,
            size,
        }
    }

    /// Create a failing outcome
    pub fn failed(path: PathBuf, error: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            path,
            error: Some(error.into()),
            size,
        }
    }

    /// Whether all probes passed
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Size as printed in logs and reports
    pub fn size_display(&self) -> String {
        match self.size {
            Some(size) => size.to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// One row of the failure report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Path of the bad file
    pub path: PathBuf,
    /// Failure detail from the first failing probe
    pub error: String,
    /// File size in bytes, `None` when stat failed
    pub size: Option<u64>,
}

impl FailureRecord {
    /// Build a record from a failed outcome, `None` if the outcome passed
    pub fn from_outcome(outcome: &Outcome) -> Option<Self> {
        outcome.error.as_ref().map(|error| Self {
            path: outcome.path.clone(),
            error: error.clone(),
            size: outcome.size,
        })
    }
}

/// Running statistics, owned by the collector
#[derive(Debug, Clone)]
pub struct AggregateStats {
    /// Outcomes received
    pub processed: u64,
    /// Failed outcomes received
    pub bad: u64,
    /// Sum of known sizes over received outcomes
    pub total_bytes: u64,
    /// When the run started
    pub start_time: Instant,
}

impl AggregateStats {
    /// Start counting from now
    pub fn new() -> Self {
        Self::since(Instant::now())
    }

    /// Start counting with rates measured from `start_time`
    pub fn since(start_time: Instant) -> Self {
        Self {
            processed: 0,
            bad: 0,
            total_bytes: 0,
            start_time,
        }
    }

    /// Account for one received outcome
    pub fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        if let Some(size) = outcome.size {
            self.total_bytes += size;
        }
        if !outcome.is_ok() {
            self.bad += 1;
        }
    }
}

impl Default for AggregateStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Final result of a directory run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Root that was checked
    pub root: PathBuf,
    /// Wall clock start of the run
    pub started_at: DateTime<Local>,
    /// Files scheduled for checking
    pub scheduled: u64,
    /// Outcomes received
    pub processed: u64,
    /// Bad files found
    pub bad: u64,
    /// Bytes covered by received outcomes
    pub total_bytes: u64,
    /// Whether collection stopped before every outcome arrived
    pub incomplete: bool,
    /// Total run duration in milliseconds
    pub duration_ms: u64,
    /// Failed files in arrival order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    /// Whether no bad file was found
    pub fn is_clean(&self) -> bool {
        self.bad == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_extension() {
        assert_eq!(Category::from_extension("jpg"), Some(Category::Image));
        assert_eq!(Category::from_extension("PNG"), Some(Category::Image));
        assert_eq!(Category::from_extension("tga"), Some(Category::Image));

        assert_eq!(Category::from_extension("psd"), Some(Category::ExtraImage));
        assert_eq!(Category::from_extension("xcf"), Some(Category::ExtraImage));
        assert_eq!(Category::from_extension("j2k"), Some(Category::ExtraImage));

        assert_eq!(Category::from_extension("mkv"), Some(Category::AudioVideo));
        assert_eq!(Category::from_extension("MP3"), Some(Category::AudioVideo));

        assert_eq!(Category::from_extension("txt"), None);
        assert_eq!(Category::from_extension(""), None);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("/a/b.JPG")), Some("jpg".to_string()));
        assert_eq!(extension_of(Path::new("/a/archive.tar.gz")), Some("gz".to_string()));
        assert_eq!(extension_of(Path::new("/a/README")), None);
    }

    #[test]
    fn test_task_resolves_category() {
        let task = Task::new(PathBuf::from("/media/clip.MOV"));
        assert_eq!(task.category, Some(Category::AudioVideo));

        let task = Task::new(PathBuf::from("/media/notes"));
        assert_eq!(task.category, None);
    }

    #[test]
    fn test_outcome_invariant() {
        let ok = Outcome::passed(PathBuf::from("a.png"), Some(10));
        assert!(ok.is_ok());
        assert!(FailureRecord::from_outcome(&ok).is_none());

        let bad = Outcome::failed(PathBuf::from("b.png"), "Zero size file", Some(0));
        assert!(!bad.is_ok());
        let record = FailureRecord::from_outcome(&bad).unwrap();
        assert_eq!(record.error, "Zero size file");
        assert_eq!(record.size, Some(0));
    }

    #[test]
    fn test_outcome_size_display() {
        let outcome = Outcome::failed(PathBuf::from("x.jpg"), "gone", None);
        assert_eq!(outcome.size_display(), "unknown");
        let outcome = Outcome::passed(PathBuf::from("x.jpg"), Some(42));
        assert_eq!(outcome.size_display(), "42");
    }

    #[test]
    fn test_stats_record() {
        let mut stats = AggregateStats::new();
        stats.record(&Outcome::passed(PathBuf::from("a"), Some(100)));
        stats.record(&Outcome::failed(PathBuf::from("b"), "bad", Some(50)));
        stats.record(&Outcome::failed(PathBuf::from("c"), "bad", None));

        assert_eq!(stats.processed, 3);
        assert_eq!(stats.bad, 2);
        assert_eq!(stats.total_bytes, 150);
    }

    #[test]
    fn test_outcome_serialization() {
        let ok = Outcome::passed(PathBuf::from("a.png"), Some(10));
        let json = serde_json::to_string(&ok).unwrap();
        assert!(!json.contains("error"));

        let bad = Outcome::failed(PathBuf::from("b.png"), "broken", None);
        let parsed: serde_json::Value = serde_json::to_value(&bad).unwrap();
        assert_eq!(parsed["error"], "broken");
        assert!(parsed["size"].is_null());
    }
}
