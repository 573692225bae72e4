use clap::{Parser, Subcommand};
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::{LevelFilter, error};
use std::path::PathBuf;
use std::process::ExitCode;
use yt_dl::commands::{self, DownloadArgs, Tools};
use yt_dl::config::Settings;
use yt_dl::progress::TaskBar;

#[derive(Parser, Clone)]
#[command(name = "yt-dl", about = "YouTube Downloader", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Download YouTube videos or audio
    Download {
        /// YouTube video or playlist URL
        url: String,

        /// Output directory [default: downloads]
        #[arg(long = "output", short)]
        output: Option<PathBuf>,

        /// Quality: best, worst, hd, sd, or format code [default: best]
        #[arg(long = "quality", short)]
        quality: Option<String>,

        /// Download audio only (MP3)
        #[arg(long = "audio", short, action = clap::ArgAction::SetTrue)]
        audio: bool,

        /// Download playlist
        #[arg(long = "playlist", short, action = clap::ArgAction::SetTrue)]
        playlist: bool,

        /// Verbose output
        #[arg(long = "verbose", short, action = clap::ArgAction::SetTrue)]
        verbose: bool,
    },
    /// Show available formats for a video
    Formats {
        /// YouTube URL to check available formats
        url: String,
    },
    /// Show current configuration
    Config,
}

fn init_logging(verbose: bool) -> MultiProgress {
    let multi = MultiProgress::new();
    let default_level = if verbose { "debug" } else { "warn" };

    let logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level),
    )
    .build();
    let level: LevelFilter = logger.filter();

    if let Err(e) = LogWrapper::new(multi.clone(), logger).try_init() {
        eprintln!("Failed to initialize logging: {}", e);
    } else {
        log::set_max_level(level);
    }

    multi
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    let verbose = matches!(args.command, Command::Download { verbose: true, .. });
    let multi = init_logging(verbose);

    let settings = Settings::load();
    let tools = Tools::discover(&settings);
    let mut stdout = std::io::stdout();

    let result = match args.command {
        Command::Download {
            url,
            output,
            quality,
            audio,
            playlist,
            verbose,
        } => {
            let engine = tools.engine();
            let download_args = DownloadArgs {
                url,
                output,
                quality,
                audio,
                playlist,
                verbose,
            };
            match TaskBar::new(&multi) {
                Ok(task) => {
                    commands::run_download(
                        &engine,
                        download_args,
                        &settings,
                        tools.muxing_tool_present(),
                        task,
                        &mut stdout,
                    )
                    .await
                }
                Err(e) => Err(e),
            }
        }
        Command::Formats { url } => commands::run_formats(&tools.engine(), &url, &mut stdout).await,
        Command::Config => {
            let path = Settings::path();
            commands::show_config(&settings, path.as_deref(), &tools, &mut stdout)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
