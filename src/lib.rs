use {
    crate::engine::Engine,
    crate::options::{DownloadRequest, build_config},
};

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod options;
pub mod progress;
pub mod utils;

pub use error::{Error, Result};
pub use options::Quality;

/// How a download invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success,
    /// The engine gave up; carries its reason.
    EngineFailure(String),
}

/// Runs one download: translates the request and hands it to the engine.
///
/// Any engine error becomes [`DownloadOutcome::EngineFailure`]; nothing is
/// retried.
pub async fn download<E: Engine + ?Sized>(
    engine: &E,
    url: &str,
    request: DownloadRequest,
    muxing_tool_present: bool,
) -> DownloadOutcome {
    let config = build_config(request, muxing_tool_present);
    log::debug!("Engine configuration: {:?}", config);

    match engine.download(url, config).await {
        Ok(()) => DownloadOutcome::Success,
        Err(e) => {
            log::debug!("Download of {} failed: {}", url, e);
            DownloadOutcome::EngineFailure(e.to_string())
        }
    }
}
