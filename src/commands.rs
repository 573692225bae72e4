//! The three commands behind the binary.
//!
//! Every command writes its user-facing report to the given writer and returns
//! the process exit code.

use crate::config::Settings;
use crate::engine::{Engine, YtDlp};
use crate::error::Result;
use crate::options::{DEFAULT_CONTAINER, DownloadRequest, Quality};
use crate::progress::{ProgressEvent, TaskBar};
use crate::{DownloadOutcome, download, utils};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

pub const DEFAULT_OUTPUT_DIR: &str = "downloads";
pub const DEFAULT_QUALITY: &str = "best";

/// Arguments of the `download` command, before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct DownloadArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub quality: Option<String>,
    pub audio: bool,
    pub playlist: bool,
    pub verbose: bool,
}

/// The external executables this tool relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tools {
    pub yt_dlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
}

impl Tools {
    /// Looks up yt-dlp and ffmpeg, honouring locations from the settings.
    pub fn discover(settings: &Settings) -> Self {
        Self {
            yt_dlp: utils::locate("yt-dlp", settings.yt_dlp.as_deref()),
            ffmpeg: utils::locate("ffmpeg", settings.ffmpeg.as_deref()),
        }
    }

    pub fn muxing_tool_present(&self) -> bool {
        self.ffmpeg.is_some()
    }

    /// Builds the engine. A missing yt-dlp is left for the spawn to report.
    pub fn engine(&self) -> YtDlp {
        let executable = self
            .yt_dlp
            .clone()
            .unwrap_or_else(|| PathBuf::from(utils::find_executable("yt-dlp")));
        YtDlp::new(executable, self.ffmpeg.clone())
    }
}

/// Downloads a video, audio track or playlist.
pub async fn run_download<E, W>(
    engine: &E,
    args: DownloadArgs,
    settings: &Settings,
    muxing_tool_present: bool,
    task: TaskBar,
    out: &mut W,
) -> Result<u8>
where
    E: Engine + ?Sized,
    W: Write,
{
    let output = args
        .output
        .or_else(|| settings.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let Ok(quality) = args
        .quality
        .or_else(|| settings.quality.clone())
        .as_deref()
        .unwrap_or(DEFAULT_QUALITY)
        .parse::<Quality>();
    let container = settings
        .container
        .clone()
        .unwrap_or_else(|| DEFAULT_CONTAINER.to_string());

    let absolute = match utils::prepare_dir(&output) {
        Ok(path) => path,
        Err(e) => {
            task.finish();
            return report_failure(out, args.verbose, &e.to_string());
        }
    };

    if !muxing_tool_present {
        log::info!("ffmpeg not found, merging and audio extraction disabled");
        if args.verbose {
            writeln!(
                out,
                "Warning: ffmpeg not found. Falling back to lower quality/direct download."
            )?;
        }
    }

    task.start();
    let mut relay = task.relay();
    let request = DownloadRequest {
        output_path: output,
        quality,
        audio_only: args.audio,
        container,
        playlist: args.playlist,
        verbose: args.verbose,
        progress_callback: Some(Box::new(move |event: ProgressEvent| relay.handle(event))),
    };

    let outcome = download(engine, &args.url, request, muxing_tool_present).await;
    task.finish();

    match outcome {
        DownloadOutcome::Success => {
            writeln!(out, "OK Downloaded to: {}", absolute.display())?;
            Ok(EXIT_SUCCESS)
        }
        DownloadOutcome::EngineFailure(reason) => report_failure(out, args.verbose, &reason),
    }
}

fn report_failure<W: Write>(out: &mut W, verbose: bool, reason: &str) -> Result<u8> {
    log::debug!("Download failed: {}", reason);
    if verbose {
        writeln!(out, "Error: {}", reason)?;
    }
    writeln!(out, "ERROR Download failed!")?;
    Ok(EXIT_FAILURE)
}

/// Prints the formats available for a URL.
pub async fn run_formats<E, W>(engine: &E, url: &str, out: &mut W) -> Result<u8>
where
    E: Engine + ?Sized,
    W: Write,
{
    writeln!(out, "Checking formats for: {}", url)?;

    match engine.list_formats(url).await {
        Ok(formats) => {
            for format in formats {
                writeln!(out, "{}", format)?;
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            writeln!(out, "Error: {}", e)?;
            Ok(EXIT_FAILURE)
        }
    }
}

/// Prints the effective configuration.
pub fn show_config<W: Write>(
    settings: &Settings,
    settings_path: Option<&Path>,
    tools: &Tools,
    out: &mut W,
) -> Result<u8> {
    writeln!(out, "Current Configuration:")?;
    match settings_path {
        Some(path) if path.is_file() => writeln!(out, "Settings file: {}", path.display())?,
        Some(path) => writeln!(out, "Settings file: {} (not found)", path.display())?,
        None => writeln!(out, "Settings file: unavailable")?,
    }

    let output = settings
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    writeln!(out, "Output directory: {}", output.display())?;
    writeln!(
        out,
        "Quality: {}",
        settings.quality.as_deref().unwrap_or(DEFAULT_QUALITY)
    )?;
    writeln!(
        out,
        "Container: {}",
        settings.container.as_deref().unwrap_or(DEFAULT_CONTAINER)
    )?;

    match &tools.yt_dlp {
        Some(path) => writeln!(out, "yt-dlp: {}", path.display())?,
        None => writeln!(out, "yt-dlp: not found")?,
    }
    match &tools.ffmpeg {
        Some(path) => writeln!(out, "ffmpeg: {}", path.display())?,
        None => writeln!(out, "ffmpeg: not found (merging and audio extraction disabled)")?,
    }
    writeln!(out, "Project: {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;

    Ok(EXIT_SUCCESS)
}
