//! Helpers for locating executables and preparing directories.

use crate::error::Result;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Returns the platform-specific file name of an executable.
pub fn find_executable(name: &str) -> String {
    if cfg!(target_os = "windows") && !name.ends_with(".exe") {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Searches the given `PATH`-style list of directories for an executable.
pub fn search_path(name: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let file_name = find_executable(name);

    std::env::split_paths(path_var?)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}

/// Resolves an executable: an explicit location wins, otherwise `PATH` is searched.
pub fn locate(name: &str, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        log::warn!("Configured {} not found at {}", name, path.display());
        return None;
    }

    let path_var = std::env::var_os("PATH");
    search_path(name, path_var.as_deref())
}

/// Creates a directory and its parents, then returns its absolute form.
pub fn prepare_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    std::fs::create_dir_all(path.as_ref())?;
    Ok(std::path::absolute(path.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_finds_file_in_listed_dir() {
        let empty = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let tool = bin.path().join(find_executable("ffmpeg"));
        std::fs::write(&tool, b"").unwrap();

        let path_var = std::env::join_paths([empty.path(), bin.path()]).unwrap();
        assert_eq!(search_path("ffmpeg", Some(path_var.as_os_str())), Some(tool));
        assert_eq!(search_path("yt-dlp", Some(path_var.as_os_str())), None);
        assert_eq!(search_path("ffmpeg", None), None);
    }

    #[test]
    fn locate_prefers_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("custom-ffmpeg");
        std::fs::write(&tool, b"").unwrap();

        assert_eq!(locate("ffmpeg", Some(tool.as_path())), Some(tool.clone()));
        let missing = dir.path().join("missing");
        assert_eq!(locate("ffmpeg", Some(missing.as_path())), None);
    }

    #[test]
    fn prepare_dir_creates_parents() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");

        let absolute = prepare_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(absolute.is_absolute());
    }
}
