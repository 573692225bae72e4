//! The boundary with the external download engine.
//!
//! The engine does all the real work: extraction, retrieval, playlist
//! enumeration, ledger bookkeeping and post-processing. This crate only hands it
//! an [`EngineConfig`] and listens to its progress.

use crate::error::Result;
use crate::options::EngineConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

pub mod ytdlp;

pub use ytdlp::YtDlp;

/// A download engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Downloads everything `url` points to, as described by `config`.
    ///
    /// Returns `Ok` when the engine completed, including when every item was
    /// already recorded in the ledger and nothing was fetched.
    async fn download(&self, url: &str, config: EngineConfig) -> Result<()>;

    /// Lists the streams available for `url` without downloading anything.
    async fn list_formats(&self, url: &str) -> Result<Vec<FormatDescriptor>>;
}

/// One stream offered by the engine for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatDescriptor {
    pub format_id: String,
    pub ext: Option<String>,
    pub resolution: Option<String>,
    #[serde(rename = "format_note")]
    pub note: Option<String>,
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.format_id,
            self.ext.as_deref().unwrap_or("-"),
            self.resolution.as_deref().unwrap_or("-"),
            self.note.as_deref().unwrap_or("")
        )
    }
}
