//! Integrity probes
//!
//! Each probe looks at one file and either passes or reports a [`ProbeError`].
//! The in-process image decoder lives here next to the wrappers around the
//! external programs (ImageMagick, ffmpeg).

use image::ImageReader;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::{CheckConfig, ErrorDetect};
use crate::error::ProbeError;

/// A single verification step
pub trait Probe: Send + Sync {
    /// Short name used in debug logs
    fn name(&self) -> &'static str;

    /// Check `path`, returning the first defect found
    fn verify(&self, path: &Path) -> Result<(), ProbeError>;
}

/// Size of the file; a zero-length file is a defect
pub fn check_size(path: &Path) -> Result<u64, ProbeError> {
    let size = std::fs::metadata(path)?.len();
    if size == 0 {
        return Err(ProbeError::ZeroSize);
    }
    Ok(size)
}

/// Longest run of equal consecutive bytes as `(value, length)`
pub fn longest_run(bytes: &[u8]) -> Option<(u8, usize)> {
    let mut iter = bytes.iter();
    let first = *iter.next()?;
    let (mut best_value, mut best_len) = (first, 1);
    let (mut value, mut len) = (first, 1);
    for &b in iter {
        if b == value {
            len += 1;
        } else {
            value = b;
            len = 1;
        }
        if len > best_len {
            best_value = value;
            best_len = len;
        }
    }
    Some((best_value, best_len))
}

/// Fail when the file holds `threshold` or more equal consecutive bytes
pub fn check_equal_run(path: &Path, threshold: usize) -> Result<(), ProbeError> {
    let bytes = std::fs::read(path)?;
    match longest_run(&bytes) {
        Some((value, len)) if len >= threshold => Err(ProbeError::EqualRun { value, len }),
        _ => Ok(()),
    }
}

/// In-process decoder: header check, then a full decode with a flip
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecodeProbe;

impl Probe for ImageDecodeProbe {
    fn name(&self) -> &'static str {
        "image-decode"
    }

    fn verify(&self, path: &Path) -> Result<(), ProbeError> {
        // header and structure only
        ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()?;

        // full decode catches truncated streams the header check misses
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        // touch every decoded pixel, as the flip in the ImageMagick probe does
        let flipped = img.fliph();
        log::trace!(
            "decoded {} as {}x{}",
            path.display(),
            flipped.width(),
            flipped.height()
        );
        Ok(())
    }
}

/// ImageMagick load with warnings promoted to errors
#[derive(Debug, Clone)]
pub struct MagickReadProbe {
    magick: PathBuf,
}

impl MagickReadProbe {
    pub fn new(magick: PathBuf) -> Self {
        Self { magick }
    }
}

impl Probe for MagickReadProbe {
    fn name(&self) -> &'static str {
        "magick-read"
    }

    fn verify(&self, path: &Path) -> Result<(), ProbeError> {
        let args: Vec<OsString> = vec![
            "-regard-warnings".into(),
            path.into(),
            "-flip".into(),
            "null:".into(),
        ];
        run_tool(&self.magick, &args).map(|_| ())
    }
}

/// `magick identify -regard-warnings`
#[derive(Debug, Clone)]
pub struct MagickIdentifyProbe {
    magick: PathBuf,
}

impl MagickIdentifyProbe {
    pub fn new(magick: PathBuf) -> Self {
        Self { magick }
    }
}

impl Probe for MagickIdentifyProbe {
    fn name(&self) -> &'static str {
        "magick-identify"
    }

    fn verify(&self, path: &Path) -> Result<(), ProbeError> {
        let args: Vec<OsString> = vec!["identify".into(), "-regard-warnings".into(), path.into()];
        match run_tool(&self.magick, &args) {
            Err(ProbeError::Tool { code, .. }) => Err(ProbeError::Identify { code }),
            other => other.map(|_| ()),
        }
    }
}

/// Decode every frame with ffmpeg into the null muxer
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    ffmpeg: PathBuf,
    error_detect: ErrorDetect,
    threads: usize,
}

impl FfmpegProbe {
    pub fn new(ffmpeg: PathBuf, error_detect: ErrorDetect, threads: usize) -> Self {
        Self {
            ffmpeg,
            error_detect,
            threads,
        }
    }

    /// Command line for `path`; input options only apply in non-default mode
    pub fn args(&self, path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-nostdin".into(),
            "-hide_banner".into(),
            "-v".into(),
            "error".into(),
        ];
        if let Some(flags) = self.error_detect.flags() {
            args.push("-err_detect".into());
            args.push(flags.into());
            args.push("-threads".into());
            args.push(self.threads.to_string().into());
        }
        args.push("-i".into());
        args.push(path.into());
        args.extend(["-f", "null", "-"].map(OsString::from));
        args
    }
}

impl Probe for FfmpegProbe {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn verify(&self, path: &Path) -> Result<(), ProbeError> {
        run_tool(&self.ffmpeg, &self.args(path)).map(|_| ())
    }
}

/// Run an external program, mapping a non-zero exit to [`ProbeError::Tool`]
fn run_tool(program: &Path, args: &[OsString]) -> Result<Vec<u8>, ProbeError> {
    let tool = program.display().to_string();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ProbeError::ToolUnavailable {
            tool: tool.clone(),
            message: e.to_string(),
        })?;

    if output.status.success() {
        return Ok(output.stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(ProbeError::Tool {
        tool,
        code: output.status.code().unwrap_or(-1),
        stderr: last_lines(&stderr, 3),
    })
}

/// Keep the tail of a tool's stderr so report rows stay short
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join(" | ")
}

/// Probes for the configured tools, grouped by category
pub(crate) fn image_probes(config: &CheckConfig) -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(ImageDecodeProbe),
        Box::new(MagickReadProbe::new(config.tools.magick.clone())),
        Box::new(MagickIdentifyProbe::new(config.tools.magick.clone())),
    ]
}

pub(crate) fn extra_image_probes(config: &CheckConfig) -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(MagickReadProbe::new(config.tools.magick.clone())),
        Box::new(MagickIdentifyProbe::new(config.tools.magick.clone())),
    ]
}

pub(crate) fn audio_video_probes(config: &CheckConfig) -> Vec<Box<dyn Probe>> {
    vec![Box::new(FfmpegProbe::new(
        config.tools.ffmpeg.clone(),
        config.error_detect.clone(),
        config.decode_threads,
    ))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn naive_longest(bytes: &[u8]) -> usize {
        let mut best = 0;
        for i in 0..bytes.len() {
            let run = bytes[i..].iter().take_while(|&&b| b == bytes[i]).count();
            best = best.max(run);
        }
        best
    }

    proptest! {
        #[test]
        fn prop_longest_run_matches_naive(bytes in proptest::collection::vec(0u8..4, 0..200)) {
            let expected = naive_longest(&bytes);
            match longest_run(&bytes) {
                None => prop_assert!(bytes.is_empty()),
                Some((value, len)) => {
                    prop_assert_eq!(len, expected);
                    let needle = vec![value; len];
                    prop_assert!(bytes.windows(len).any(|w| w == needle.as_slice()));
                }
            }
        }
    }

    #[test]
    fn test_longest_run_at_end() {
        assert_eq!(longest_run(&[1, 2, 0, 0, 0]), Some((0, 3)));
        assert_eq!(longest_run(&[7, 7, 1]), Some((7, 2)));
        assert_eq!(longest_run(&[5]), Some((5, 1)));
        assert_eq!(longest_run(&[]), None);
    }

    #[test]
    fn test_check_size() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.jpg");
        fs::write(&empty, b"").unwrap();
        assert!(matches!(check_size(&empty), Err(ProbeError::ZeroSize)));

        let full = dir.path().join("full.jpg");
        fs::write(&full, b"abc").unwrap();
        assert_eq!(check_size(&full).unwrap(), 3);

        assert!(matches!(
            check_size(&dir.path().join("missing.jpg")),
            Err(ProbeError::Io(_))
        ));
    }

    #[test]
    fn test_check_equal_run_threshold() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("padded.png");
        let mut bytes = vec![1u8, 2, 3];
        bytes.extend(std::iter::repeat(0u8).take(100));
        fs::write(&path, &bytes).unwrap();

        assert!(check_equal_run(&path, 101).is_ok());
        let err = check_equal_run(&path, 100).unwrap_err();
        assert_eq!(err.to_string(), "Equal value sequence, value: 0, len: 100");
    }

    #[test]
    fn test_image_decode_probe() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.png");
        image::RgbImage::from_fn(32, 32, |x, y| image::Rgb([x as u8 * 8, y as u8 * 8, 128]))
            .save(&good)
            .unwrap();
        assert!(ImageDecodeProbe.verify(&good).is_ok());

        let bytes = fs::read(&good).unwrap();
        let truncated = dir.path().join("truncated.png");
        fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();
        assert!(ImageDecodeProbe.verify(&truncated).is_err());

        let garbage = dir.path().join("garbage.jpg");
        fs::write(&garbage, b"definitely not a jpeg").unwrap();
        assert!(matches!(
            ImageDecodeProbe.verify(&garbage),
            Err(ProbeError::Decode(_))
        ));
    }

    #[test]
    fn test_ffmpeg_args_default_mode() {
        let probe = FfmpegProbe::new(PathBuf::from("ffmpeg"), ErrorDetect::Default, 0);
        let args = probe.args(Path::new("clip.mp4"));
        assert!(!args.contains(&OsString::from("-err_detect")));
        assert_eq!(
            args[args.len() - 5..],
            ["-i", "clip.mp4", "-f", "null", "-"].map(OsString::from)
        );
    }

    #[test]
    fn test_ffmpeg_args_strict_mode() {
        let probe = FfmpegProbe::new(PathBuf::from("ffmpeg"), ErrorDetect::Strict, 2);
        let args = probe.args(Path::new("clip.mp4"));
        let pos = args.iter().position(|a| a == "-err_detect").unwrap();
        assert_eq!(args[pos + 1], "+crccheck+bitstream+buffer+explode");
        assert_eq!(args[pos + 2], "-threads");
        assert_eq!(args[pos + 3], "2");
        // input options precede the input
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(pos < input);
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let probe = MagickIdentifyProbe::new(PathBuf::from("/nonexistent/magick-tool"));
        let err = probe.verify(Path::new("x.psd")).unwrap_err();
        assert!(matches!(err, ProbeError::ToolUnavailable { .. }));
    }

    #[test]
    fn test_last_lines() {
        assert_eq!(last_lines("a\nb\n\nc\nd\n", 2), "c | d");
        assert_eq!(last_lines("", 3), "");
    }
}
