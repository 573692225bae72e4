//! The errors that can occur.

use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The possible errors that can occur.
#[derive(Debug, Error)]
pub enum Error {
    /// An error occurred while running the runtime.
    #[error("An error occurred while running the runtime: {0}")]
    Runtime(#[from] tokio::task::JoinError),
    /// An error occurred while interacting with the file system.
    #[error("An IO error occurred: {0}")]
    IO(#[from] std::io::Error),
    /// An error occurred while parsing the engine's JSON output.
    #[error("An error occurred while parsing JSON: {0}")]
    Serde(#[from] serde_json::Error),
    /// The settings file could not be parsed.
    #[error("Malformed settings file: {0}")]
    Settings(#[from] toml::de::Error),
    /// A progress bar template was rejected.
    #[error("Invalid progress template: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    /// The engine process exited unsuccessfully.
    #[error("Failed to execute command: {0}")]
    Command(String),
    /// A required executable could not be located.
    #[error("Executable not found: {0}")]
    MissingExecutable(String),
}
