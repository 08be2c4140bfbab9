//! Media Checker CLI
//!
//! Checks the integrity of image, audio and video files.

use clap::Parser;
use env_logger::Env;
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use media_checker::config::STRICT_ERR_DETECT;
use media_checker::models::{
    AUDIO_EXTENSIONS, EXTRA_IMAGE_EXTENSIONS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS,
};
use media_checker::{check_directory, check_file, CheckConfig, ErrorDetect, OutputMode};

const ABOUT: &str = "Checks integrity of Media files (Images, Video, Audio).";

/// Exit status when the single checked file is bad
const EXIT_BAD_FILE: u8 = 1;
/// Exit status when the run could not start or finish
const EXIT_RUN_ERROR: u8 = 2;

fn after_help() -> String {
    format!(
        "\
- single file check ignores options -i, -m, -e, -c, -t, -T
- with --err-detect you can provide the 'strict' shortcut ({}) or flags supported by ffmpeg,
  e.g. crccheck, bitstream, buffer, explode, or a combination such as +buffer+bitstream
- supported image formats/extensions: {}
- supported image EXTRA formats/extensions: {}
- supported audio/video extensions: {}
- output CSV file has a header row and one line for each bad file: file name, error message, file size",
        STRICT_ERR_DETECT,
        IMAGE_EXTENSIONS.join(", "),
        EXTRA_IMAGE_EXTENSIONS.join(", "),
        [VIDEO_EXTENSIONS, AUDIO_EXTENSIONS].concat().join(", "),
    )
}

#[derive(Parser)]
#[command(name = "media_checker")]
#[command(author, version, about = ABOUT, long_about = None, after_help = after_help())]
struct Cli {
    /// Path to the file or folder
    #[arg(value_name = "P")]
    checkpath: PathBuf,

    /// Save bad files details on csv file X
    #[arg(short = 'c', long = "csv", value_name = "X")]
    csv: Option<PathBuf>,

    /// Recurse subdirs
    #[arg(short = 'r', long = "recurse")]
    recurse: bool,

    /// Detect files containing at least Z equal consecutive bytes (0 = off).
    /// Most formats hold short runs, so Z needs to be large for this to make sense
    #[arg(short = 'z', long = "enable-zero-detect", value_name = "Z", default_value_t = 0)]
    zero_detect: usize,

    /// Ignore image files
    #[arg(short = 'i', long = "disable-images")]
    disable_images: bool,

    /// Enable check for audio/video files
    #[arg(short = 'm', long = "enable-media")]
    enable_media: bool,

    /// Ignore extra image extensions (psd, xcf and rare ones)
    #[arg(short = 'e', long = "disable-extra")]
    disable_extra: bool,

    /// ffmpeg err_detect flags E, 'strict' is a shortcut
    #[arg(short = 'x', long = "err-detect", value_name = "E", default_value = "default")]
    err_detect: String,

    /// Number of parallel workers, default is (cpu_count / 2 + 1)
    #[arg(short = 't', long = "threads", value_name = "T", default_value_t = 0)]
    threads: usize,

    /// Seconds to wait for each new check result; raise it for videos of a few GB
    #[arg(short = 'T', long = "timeout", value_name = "K", default_value_t = 120)]
    timeout: u64,

    /// Print progress and the summary as JSON
    #[arg(long)]
    json: bool,
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize output: {}", e),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut builder = CheckConfig::builder()
        .recursive(cli.recurse)
        .zero_detect(cli.zero_detect)
        .images(!cli.disable_images)
        .extra_images(!cli.disable_extra)
        .audio_video(cli.enable_media)
        .error_detect(ErrorDetect::parse(&cli.err_detect))
        .num_threads(cli.threads)
        .timeout_secs(cli.timeout);
    if let Some(csv) = cli.csv {
        builder = builder.csv_path(csv);
    }
    let config = builder.build();
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    // stdout carries nothing but the JSON document in --json mode
    if cli.json {
        info!("Files integrity check for: {}", cli.checkpath.display());
    } else {
        println!("Files integrity check for: {}", cli.checkpath.display());
    }

    if cli.checkpath.is_file() {
        let outcome = check_file(&cli.checkpath, &config);
        if cli.json {
            print_json(&outcome);
        } else if outcome.is_ok() {
            println!("File {} is OK", cli.checkpath.display());
        } else {
            println!(
                "Bad file: {}, error detail: {}, size[bytes]: {}",
                outcome.path.display(),
                outcome.error.as_deref().unwrap_or_default(),
                outcome.size_display()
            );
        }
        return if outcome.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(EXIT_BAD_FILE)
        };
    }

    info!("Recursive: {}", config.recursive);
    info!("Threads: {}", config.effective_threads());
    info!("Timeout: {}s", config.timeout_secs);
    info!("Zero detect: {}", config.zero_detect);

    let summary = match check_directory(&cli.checkpath, &config, mode) {
        Ok(summary) => summary,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(EXIT_RUN_ERROR);
        }
    };

    if cli.json {
        print_json(&summary);
    } else if summary.is_clean() {
        println!("The files are OK :-)");
    } else {
        println!("Few files look damaged :-(");
    }

    ExitCode::SUCCESS
}
