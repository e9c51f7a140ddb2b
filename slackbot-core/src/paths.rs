// ABOUTME: XDG Base Directory paths for configuration and log storage
// ABOUTME: Falls back to the working directory when no home directory is known

use directories::ProjectDirs;
use std::path::PathBuf;

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "slackbot";
const APPLICATION: &str = "slackbot";

/// Get XDG-compliant directories for the application
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// Data directory (e.g., ~/.local/share/slackbot/), or ./data
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Log directory inside the data dir
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Config directory (e.g., ~/.config/slackbot/), or the current directory
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default config file path
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
