//! Translation of user intents into engine configuration.
//!
//! [`build_config`] is a pure mapping: it never touches the network or the file
//! system, and it never fails. When the muxing tool is missing it quietly falls
//! back to selectors that need no merging.

use crate::progress::ProgressEvent;
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Callback receiving progress events from the engine.
pub type ProgressHook = Box<dyn FnMut(ProgressEvent) + Send>;

/// Container used for merged video+audio output.
pub const DEFAULT_CONTAINER: &str = "mp4";
/// Name of the de-duplication ledger written in playlist mode.
pub const ARCHIVE_FILE: &str = "archive.txt";

const SINGLE_TEMPLATE: &str = "%(title)s.%(ext)s";
const PLAYLIST_TEMPLATE: &str = "%(playlist)s/%(playlist_index)s - %(title)s.%(ext)s";
const AUDIO_SELECTOR: &str = "bestaudio/best";
const FALLBACK_SELECTOR: &str = "best";

/// Represents the requested quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Quality {
    /// Highest quality separate streams, merged.
    #[default]
    Best,
    /// Lowest quality separate streams, merged.
    Worst,
    /// Best streams capped at 1080p.
    Hd,
    /// Best streams capped at 480p.
    Sd,
    /// Raw engine selector, passed through untouched.
    Custom(String),
}

impl Quality {
    /// Returns the engine format selector for this tier.
    pub fn selector(&self) -> &str {
        match self {
            Quality::Best => "bestvideo+bestaudio/best",
            Quality::Worst => "worstvideo+worstaudio/worst",
            Quality::Hd => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
            Quality::Sd => "bestvideo[height<=480]+bestaudio/best[height<=480]",
            Quality::Custom(selector) => selector,
        }
    }
}

impl FromStr for Quality {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "best" => Quality::Best,
            "worst" => Quality::Worst,
            "hd" => Quality::Hd,
            "sd" => Quality::Sd,
            other => Quality::Custom(other.to_string()),
        })
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Best => write!(f, "best"),
            Quality::Worst => write!(f, "worst"),
            Quality::Hd => write!(f, "hd"),
            Quality::Sd => write!(f, "sd"),
            Quality::Custom(selector) => write!(f, "{}", selector),
        }
    }
}

/// Everything the user asked for in a single invocation.
pub struct DownloadRequest {
    /// The directory where files are written.
    pub output_path: PathBuf,
    /// The requested quality tier.
    pub quality: Quality,
    /// Only fetch the audio stream.
    pub audio_only: bool,
    /// Target container for merged output.
    pub container: String,
    /// Fetch every item of a playlist instead of the first match.
    pub playlist: bool,
    /// Let the engine print its own diagnostics.
    pub verbose: bool,
    /// Receives progress events while the engine runs.
    pub progress_callback: Option<ProgressHook>,
}

impl Default for DownloadRequest {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("downloads"),
            quality: Quality::default(),
            audio_only: false,
            container: DEFAULT_CONTAINER.to_string(),
            playlist: false,
            verbose: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("output_path", &self.output_path)
            .field("quality", &self.quality)
            .field("audio_only", &self.audio_only)
            .field("container", &self.container)
            .field("playlist", &self.playlist)
            .field("verbose", &self.verbose)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

/// A post-processing step run by the engine after retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    /// Transcode the downloaded stream to an audio-only file.
    ExtractAudio {
        /// The target audio codec.
        codec: String,
        /// The target quality, in kbps.
        quality: String,
    },
}

/// Configuration handed to the engine, one field per engine key.
pub struct EngineConfig {
    pub outtmpl: PathBuf,
    pub quiet: bool,
    pub no_warnings: bool,
    pub progress_hook: Option<ProgressHook>,
    pub yes_playlist: bool,
    pub noplaylist: bool,
    pub download_archive: Option<PathBuf>,
    pub format: String,
    pub postprocessors: Vec<PostProcessor>,
    pub merge_output_format: Option<String>,
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("outtmpl", &self.outtmpl)
            .field("quiet", &self.quiet)
            .field("no_warnings", &self.no_warnings)
            .field(
                "progress_hook",
                &format_args!(
                    "{}",
                    if self.progress_hook.is_some() {
                        "Some(Fn)"
                    } else {
                        "None"
                    }
                ),
            )
            .field("yes_playlist", &self.yes_playlist)
            .field("noplaylist", &self.noplaylist)
            .field("download_archive", &self.download_archive)
            .field("format", &self.format)
            .field("postprocessors", &self.postprocessors)
            .field("merge_output_format", &self.merge_output_format)
            .finish()
    }
}

/// Builds the engine configuration for a request.
///
/// # Arguments
///
/// * `request` - The user's request, consumed.
/// * `muxing_tool_present` - Whether ffmpeg is available to merge or transcode.
pub fn build_config(request: DownloadRequest, muxing_tool_present: bool) -> EngineConfig {
    let DownloadRequest {
        output_path,
        quality,
        audio_only,
        container,
        playlist,
        verbose,
        progress_callback,
    } = request;

    let mut config = EngineConfig {
        outtmpl: output_path.join(SINGLE_TEMPLATE),
        quiet: !verbose,
        no_warnings: !verbose,
        progress_hook: progress_callback,
        yes_playlist: false,
        noplaylist: false,
        download_archive: None,
        format: FALLBACK_SELECTOR.to_string(),
        postprocessors: Vec::new(),
        merge_output_format: None,
    };

    if playlist {
        config.yes_playlist = true;
        config.outtmpl = output_path.join(PLAYLIST_TEMPLATE);
        config.download_archive = Some(output_path.join(ARCHIVE_FILE));
    } else {
        config.noplaylist = true;
    }

    if audio_only {
        config.format = AUDIO_SELECTOR.to_string();
        if muxing_tool_present {
            config.postprocessors.push(PostProcessor::ExtractAudio {
                codec: "mp3".to_string(),
                quality: "192".to_string(),
            });
        }
    } else if muxing_tool_present {
        config.format = quality.selector().to_string();
        if container == DEFAULT_CONTAINER {
            config.merge_output_format = Some(DEFAULT_CONTAINER.to_string());
        }
    }

    config
}
