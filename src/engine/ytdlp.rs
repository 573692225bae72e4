//! The `yt-dlp` executable as a download engine.

use crate::engine::{Engine, FormatDescriptor};
use crate::error::{Error, Result};
use crate::options::{EngineConfig, PostProcessor, ProgressHook};
use crate::progress::ProgressEvent;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Prefix of the lines written through `--progress-template`.
const PROGRESS_TAG: &str = "[progress]";
const PROGRESS_TEMPLATE: &str = "download:[progress] %(progress.status)s %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[progress\]\s+(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s*$").expect("valid progress regex")
});

/// Drives the `yt-dlp` executable.
#[derive(Debug, Clone, PartialEq)]
pub struct YtDlp {
    /// The path to the yt-dlp executable.
    pub executable: PathBuf,
    /// The ffmpeg executable handed to yt-dlp, if known.
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Deserialize)]
struct InfoDump {
    #[serde(default)]
    formats: Vec<FormatDescriptor>,
}

impl YtDlp {
    pub fn new(executable: impl Into<PathBuf>, ffmpeg: Option<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ffmpeg,
        }
    }

    /// Translates a configuration into yt-dlp arguments, ending with the URL.
    pub fn command_args(&self, url: &str, config: &EngineConfig) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        let mut push = |arg: &str| args.push(OsString::from(arg));

        push("--no-update");
        if config.quiet {
            push("--quiet");
        }
        if config.no_warnings {
            push("--no-warnings");
        }
        if config.yes_playlist {
            push("--yes-playlist");
        }
        if config.noplaylist {
            push("--no-playlist");
        }
        push("-f");
        push(&config.format);

        for postprocessor in &config.postprocessors {
            match postprocessor {
                PostProcessor::ExtractAudio { codec, quality } => {
                    push("--extract-audio");
                    push("--audio-format");
                    push(codec);
                    push("--audio-quality");
                    push(&format!("{}K", quality));
                }
            }
        }
        if let Some(container) = &config.merge_output_format {
            push("--merge-output-format");
            push(container);
        }
        if config.progress_hook.is_some() {
            push("--newline");
            push("--progress");
            push("--progress-template");
            push(PROGRESS_TEMPLATE);
        }

        args.push("-o".into());
        args.push(config.outtmpl.clone().into());
        if let Some(archive) = &config.download_archive {
            args.push("--download-archive".into());
            args.push(archive.clone().into());
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.clone().into());
        }

        args.push(url.into());
        args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.executable);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(0x08000000);
        }

        command
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::MissingExecutable(self.executable.display().to_string())
        } else {
            Error::IO(e)
        }
    }
}

#[async_trait]
impl Engine for YtDlp {
    async fn download(&self, url: &str, mut config: EngineConfig) -> Result<()> {
        let args = self.command_args(url, &config);
        log::debug!("Running {} {:?}", self.executable.display(), args);

        let mut child = self
            .command()
            .args(&args)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Command("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Command("Failed to capture stderr".to_string()))?;

        // Drain stderr on its own task so a chatty engine cannot block on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            stderr.read_to_end(&mut buffer).await?;
            Ok::<Vec<u8>, std::io::Error>(buffer)
        });

        let mut reader = BufReader::new(stdout);
        if let Err(e) = relay_output(&mut reader, &mut config.progress_hook).await {
            log::warn!("Lost yt-dlp output, stopping it: {}", e);
            if let Err(e) = child.kill().await {
                log::error!("Failed to kill yt-dlp: {}", e);
            }
            stderr_task.abort();
            return Err(Error::IO(e));
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await??;
        check_status(status, &String::from_utf8_lossy(&stderr))
    }

    async fn list_formats(&self, url: &str) -> Result<Vec<FormatDescriptor>> {
        let args = [
            "--no-update",
            "--dump-single-json",
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            url,
        ];
        log::debug!("Running {} {:?}", self.executable.display(), args);

        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        check_status(output.status, &String::from_utf8_lossy(&output.stderr))?;

        parse_formats(&output.stdout)
    }
}

/// Feeds the engine's stdout to the hook line by line until it closes.
///
/// Lines are decoded lossily, so output in a foreign console encoding never
/// stops the stream.
async fn relay_output<R>(reader: &mut R, hook: &mut Option<ProgressHook>) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim_end_matches(['\r', '\n']);
        match parse_progress_line(line) {
            Some(event) => {
                if let Some(hook) = hook.as_mut() {
                    hook(event);
                }
            }
            None => log::debug!("[yt-dlp] {}", line),
        }
    }
}

fn check_status(status: ExitStatus, stderr: &str) -> Result<()> {
    let code = status.code().unwrap_or(-1);
    log::debug!("yt-dlp exited with code {}", code);

    if status.success() {
        return Ok(());
    }

    Err(Error::Command(format!(
        "Process failed with code {}: {}",
        code,
        failure_reason(stderr)
    )))
}

/// Picks the most useful line out of the engine's stderr.
fn failure_reason(stderr: &str) -> &str {
    stderr
        .lines()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .unwrap_or_else(|| stderr.trim())
}

/// Parses the formats out of a `--dump-single-json` document.
pub fn parse_formats(json: &[u8]) -> Result<Vec<FormatDescriptor>> {
    let dump: InfoDump = serde_json::from_slice(json)?;
    Ok(dump.formats)
}

/// Parses one line written through the progress template.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    if !line.starts_with(PROGRESS_TAG) {
        return None;
    }
    let caps = PROGRESS_RE.captures(line.trim_end())?;

    let event = match &caps[1] {
        "downloading" => ProgressEvent::Downloading {
            total: parse_bytes(&caps[3]).or_else(|| parse_bytes(&caps[4])),
            downloaded: parse_bytes(&caps[2]).unwrap_or(0),
        },
        "finished" => ProgressEvent::Finished,
        other => ProgressEvent::Unknown(other.to_string()),
    };

    Some(event)
}

/// yt-dlp prints `NA` for missing fields and floats for estimates.
fn parse_bytes(field: &str) -> Option<u64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{DownloadRequest, build_config};
    use std::sync::{Arc, Mutex};

    fn args_for(request: DownloadRequest, muxer: bool) -> Vec<String> {
        let engine = YtDlp::new("yt-dlp", None);
        let config = build_config(request, muxer);
        engine
            .command_args("https://example.com/watch?v=abc", &config)
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn video_request_maps_to_flags() {
        let request = DownloadRequest {
            quality: "hd".parse().unwrap(),
            ..Default::default()
        };
        let args = args_for(request, true);

        assert_eq!(
            value_after(&args, "-f"),
            Some("bestvideo[height<=1080]+bestaudio/best[height<=1080]")
        );
        assert_eq!(value_after(&args, "--merge-output-format"), Some("mp4"));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--quiet".to_string()));
        assert!(!args.contains(&"--extract-audio".to_string()));
        assert!(!args.contains(&"--progress-template".to_string()));
        assert_eq!(
            args.last().map(String::as_str),
            Some("https://example.com/watch?v=abc")
        );
    }

    #[test]
    fn playlist_audio_request_maps_to_flags() {
        let request = DownloadRequest {
            audio_only: true,
            playlist: true,
            verbose: true,
            progress_callback: Some(Box::new(|_: ProgressEvent| {})),
            ..Default::default()
        };
        let args = args_for(request, true);

        assert!(args.contains(&"--yes-playlist".to_string()));
        assert!(args.contains(&"--extract-audio".to_string()));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("192K"));
        assert!(value_after(&args, "--download-archive").unwrap().ends_with("archive.txt"));
        assert!(value_after(&args, "-o").unwrap().contains("%(playlist_index)s"));
        assert_eq!(value_after(&args, "--progress-template"), Some(PROGRESS_TEMPLATE));
        assert!(!args.contains(&"--quiet".to_string()));
    }

    #[test]
    fn ffmpeg_location_is_forwarded() {
        let engine = YtDlp::new("yt-dlp", Some(PathBuf::from("/opt/ffmpeg")));
        let config = build_config(DownloadRequest::default(), true);
        let args = engine.command_args("u", &config);

        let index = args.iter().position(|a| a == "--ffmpeg-location").unwrap();
        assert_eq!(args[index + 1], OsString::from("/opt/ffmpeg"));
    }

    #[test]
    fn parses_progress_lines() {
        assert_eq!(
            parse_progress_line("[progress] downloading 200 1000 NA"),
            Some(ProgressEvent::Downloading {
                total: Some(1000),
                downloaded: 200
            })
        );
        assert_eq!(
            parse_progress_line("[progress] downloading 512 NA 2048.7"),
            Some(ProgressEvent::Downloading {
                total: Some(2048),
                downloaded: 512
            })
        );
        assert_eq!(
            parse_progress_line("[progress] downloading 512 NA NA"),
            Some(ProgressEvent::Downloading {
                total: None,
                downloaded: 512
            })
        );
        assert_eq!(
            parse_progress_line("[progress] finished 1000 1000 NA\r"),
            Some(ProgressEvent::Finished)
        );
        assert_eq!(
            parse_progress_line("[progress] error 0 NA NA"),
            Some(ProgressEvent::Unknown("error".to_string()))
        );
        assert_eq!(parse_progress_line("[download] Destination: a.mp4"), None);
    }

    #[test]
    fn parses_format_dump() {
        let json = br#"{
            "id": "abc",
            "title": "t",
            "formats": [
                {"format_id": "140", "ext": "m4a", "resolution": "audio only", "format_note": "medium"},
                {"format_id": "137", "ext": "mp4", "resolution": "1920x1080", "format_note": null, "vcodec": "avc1"}
            ]
        }"#;

        let formats = parse_formats(json).unwrap();
        assert_eq!(formats.len(), 2);
        assert_eq!(formats[0].to_string(), "140 m4a audio only medium");
        assert_eq!(formats[1].note, None);

        assert!(parse_formats(b"not json").is_err());
        assert!(parse_formats(br#"{"id": "x"}"#).unwrap().is_empty());
    }

    #[test]
    fn failure_reason_prefers_error_line() {
        let stderr = "WARNING: something\nERROR: [youtube] abc: Video unavailable\n";
        assert_eq!(failure_reason(stderr), "ERROR: [youtube] abc: Video unavailable");
        assert_eq!(failure_reason("  boom \n"), "boom");
    }

    #[tokio::test]
    async fn output_with_invalid_utf8_keeps_relaying() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut hook: Option<ProgressHook> = Some(Box::new(move |event: ProgressEvent| {
            sink.lock().unwrap().push(event);
        }));

        let output: &[u8] = b"[progress] downloading 100 1000 NA\r\n\
            [download] Destination: \xff\xfe title.mp4\n\
            [progress] finished 1000 1000 NA";
        let mut reader = output;
        relay_output(&mut reader, &mut hook).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ProgressEvent::Downloading {
                    total: Some(1000),
                    downloaded: 100
                },
                ProgressEvent::Finished,
            ]
        );
    }

    #[tokio::test]
    async fn missing_executable_is_reported() {
        let engine = YtDlp::new("/nonexistent/yt-dlp-binary", None);
        let err = engine.list_formats("u").await.unwrap_err();

        assert!(matches!(err, Error::MissingExecutable(_)));
    }
}
