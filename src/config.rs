//! Configuration for the media checker

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{AUDIO_EXTENSIONS, EXTRA_IMAGE_EXTENSIONS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

/// Default seconds to wait for the next outcome before giving up
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default time a worker waits for a task before it closes
pub const DEFAULT_POLL_WINDOW: Duration = Duration::from_secs(2);

/// Minimum seconds between throttled progress lines
pub const UPDATE_SEC_INTERVAL: u64 = 5;

/// Minimum MiB processed between throttled progress lines
pub const UPDATE_MB_INTERVAL: u64 = 500;

/// ffmpeg flags behind the `strict` shortcut
pub const STRICT_ERR_DETECT: &str = "+crccheck+bitstream+buffer+explode";

/// How hard ffmpeg looks for decode errors
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorDetect {
    /// ffmpeg defaults, no `-err_detect`
    #[default]
    Default,
    /// Shortcut for [`STRICT_ERR_DETECT`]
    Strict,
    /// Raw `-err_detect` flag string, e.g. `+buffer+bitstream`
    Custom(String),
}

impl ErrorDetect {
    /// Parse the command-line value
    pub fn parse(value: &str) -> Self {
        match value {
            "default" => ErrorDetect::Default,
            "strict" => ErrorDetect::Strict,
            other => ErrorDetect::Custom(other.to_string()),
        }
    }

    /// Flags to pass to `-err_detect`, `None` for ffmpeg defaults
    pub fn flags(&self) -> Option<&str> {
        match self {
            ErrorDetect::Default => None,
            ErrorDetect::Strict => Some(STRICT_ERR_DETECT),
            ErrorDetect::Custom(flags) => Some(flags),
        }
    }
}

/// External programs used by the probes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    /// ImageMagick 7 entry point
    pub magick: PathBuf,
    /// ffmpeg binary
    pub ffmpeg: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            magick: PathBuf::from("magick"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

/// Run configuration, built once before scanning and never mutated after
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Whether to descend into subdirectories
    pub recursive: bool,

    /// Fail files holding at least this many equal consecutive bytes (0 = off)
    pub zero_detect: usize,

    /// Check common image formats
    pub enable_images: bool,

    /// Check rare image formats (psd, xcf, tga, ...)
    pub enable_extra_images: bool,

    /// Check audio and video files
    pub enable_audio_video: bool,

    /// ffmpeg error detection mode
    pub error_detect: ErrorDetect,

    /// Number of parallel workers
    /// 0 means auto-detect (CPU cores / 2 + 1)
    pub num_threads: usize,

    /// Thread hint passed to ffmpeg (0 = let ffmpeg decide)
    pub decode_threads: usize,

    /// Seconds to wait for each outcome before collection stops
    pub timeout_secs: u64,

    /// How long an idle worker waits for a task before closing
    pub poll_window: Duration,

    /// Where to write the bad-file CSV report
    pub csv_path: Option<PathBuf>,

    /// External programs
    pub tools: ToolPaths,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            zero_detect: 0,
            enable_images: true,
            enable_extra_images: true,
            enable_audio_video: false,
            error_detect: ErrorDetect::Default,
            num_threads: 0,
            decode_threads: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_window: DEFAULT_POLL_WINDOW,
            csv_path: None,
            tools: ToolPaths::default(),
        }
    }
}

impl CheckConfig {
    /// Create a config builder
    pub fn builder() -> CheckConfigBuilder {
        CheckConfigBuilder::new()
    }

    /// Extensions selected by the enabled categories
    pub fn allowed_extensions(&self) -> HashSet<String> {
        let mut extensions = HashSet::new();
        if self.enable_images {
            extensions.extend(IMAGE_EXTENSIONS.iter().map(|s| s.to_string()));
            if self.enable_extra_images {
                extensions.extend(EXTRA_IMAGE_EXTENSIONS.iter().map(|s| s.to_string()));
            }
        }
        if self.enable_audio_video {
            extensions.extend(VIDEO_EXTENSIONS.iter().map(|s| s.to_string()));
            extensions.extend(AUDIO_EXTENSIONS.iter().map(|s| s.to_string()));
        }
        extensions
    }

    /// Get the effective number of threads
    pub fn effective_threads(&self) -> usize {
        if self.num_threads == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get() / 2 + 1)
                .unwrap_or(2)
        } else {
            self.num_threads
        }
    }

    /// Per-outcome collection timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Builder for CheckConfig
#[derive(Debug, Default)]
pub struct CheckConfigBuilder {
    config: CheckConfig,
}

impl CheckConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable recursive scanning
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.config.recursive = enabled;
        self
    }

    /// Set the equal-byte run threshold (0 disables the probe)
    pub fn zero_detect(mut self, threshold: usize) -> Self {
        self.config.zero_detect = threshold;
        self
    }

    /// Enable or disable image checks
    pub fn images(mut self, enabled: bool) -> Self {
        self.config.enable_images = enabled;
        self
    }

    /// Enable or disable rare image formats
    pub fn extra_images(mut self, enabled: bool) -> Self {
        self.config.enable_extra_images = enabled;
        self
    }

    /// Enable or disable audio/video checks
    pub fn audio_video(mut self, enabled: bool) -> Self {
        self.config.enable_audio_video = enabled;
        self
    }

    /// Set the ffmpeg error detection mode
    pub fn error_detect(mut self, mode: ErrorDetect) -> Self {
        self.config.error_detect = mode;
        self
    }

    /// Set the number of workers
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    /// Set the ffmpeg thread hint
    pub fn decode_threads(mut self, threads: usize) -> Self {
        self.config.decode_threads = threads;
        self
    }

    /// Set the collection timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Set the idle worker poll window
    pub fn poll_window(mut self, window: Duration) -> Self {
        self.config.poll_window = window;
        self
    }

    /// Set the CSV report path
    pub fn csv_path(mut self, path: PathBuf) -> Self {
        self.config.csv_path = Some(path);
        self
    }

    /// Override the external program locations
    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.config.tools = tools;
        self
    }

    /// Build the config
    pub fn build(self) -> CheckConfig {
        self.config
    }
}
