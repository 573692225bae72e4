//! Optional user settings, read from `<config_dir>/yt-dl/config.toml`.

use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "yt-dl";
const SETTINGS_FILE: &str = "config.toml";

/// Defaults applied when a flag is not given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub output_dir: Option<PathBuf>,
    pub quality: Option<String>,
    pub container: Option<String>,
    /// Location of the yt-dlp executable.
    pub yt_dlp: Option<PathBuf>,
    /// Location of the ffmpeg executable.
    pub ffmpeg: Option<PathBuf>,
}

impl Settings {
    /// Returns the settings file location, if the platform has a config directory.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Parses settings from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads settings from a file. A missing or empty file yields the defaults.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() || fs::metadata(path)?.len() == 0 {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Loads the user's settings, falling back to defaults when they are unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };

        match Self::read(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_settings() {
        let settings =
            Settings::parse("quality = \"hd\"\nffmpeg = \"/opt/ffmpeg/bin/ffmpeg\"\n").unwrap();

        assert_eq!(settings.quality.as_deref(), Some("hd"));
        assert_eq!(settings.ffmpeg, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
        assert_eq!(settings.output_dir, None);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Settings::parse("qualty = \"hd\"").is_err());
    }

    #[test]
    fn missing_or_empty_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        assert_eq!(Settings::read(&path).unwrap(), Settings::default());

        fs::write(&path, "").unwrap();
        assert_eq!(Settings::read(&path).unwrap(), Settings::default());

        fs::write(&path, "output_dir = \"media\"").unwrap();
        assert_eq!(
            Settings::read(&path).unwrap().output_dir,
            Some(PathBuf::from("media"))
        );
    }
}
