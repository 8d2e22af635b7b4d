//! Configuration and data paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/scenario-runner/`, `~/.local/share/scenario-runner/`
//! - macOS: `~/Library/Application Support/scenario-runner/`
//! - Windows: `%APPDATA%\scenario-runner\`

use std::path::{Path, PathBuf};

/// Name used for the configuration and data directories
const APP_NAME: &str = "scenario-runner";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the data directory, falling back to `~/.scenario-runner`
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| home_dir().join(format!(".{}", APP_NAME)))
}

/// Root under which each runner family gets its private install prefix
pub fn tools_root() -> PathBuf {
    data_dir().join("tools")
}

/// Directory holding the reporter plugins shipped alongside the runner
pub fn resources_dir() -> PathBuf {
    data_dir().join("resources")
}

/// Default directory for report files and other run artifacts
pub fn artifacts_dir() -> PathBuf {
    std::env::temp_dir().join(APP_NAME).join("artifacts")
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Expand a leading `~` and make the path absolute against `base`
pub fn full_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    };

    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}
