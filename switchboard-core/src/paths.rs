// ABOUTME: Per-user locations for switchboard's config, coordinate file, logs, and audit cache
// ABOUTME: Resolved through the platform's XDG directories, with relative fallbacks

use directories::ProjectDirs;
use std::path::PathBuf;

const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "switchboard";
const APPLICATION: &str = "switchboard";

fn dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// e.g. ~/.local/share/switchboard/, or ./data without a home directory
pub fn data_dir() -> PathBuf {
    dirs().map_or_else(|| PathBuf::from("./data"), |d| d.data_dir().to_path_buf())
}

/// Daily rolling log files are written here.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Default location of the coordination audit cache
pub fn cache_file() -> PathBuf {
    data_dir().join("coordination_cache.json")
}

/// e.g. ~/.config/switchboard/, or the working directory without a home directory
pub fn config_dir() -> PathBuf {
    dirs().map_or_else(|| PathBuf::from("."), |d| d.config_dir().to_path_buf())
}

pub fn config_file() -> PathBuf {
    config_dir().join("switchboard.toml")
}

/// Agent coordinate file read when no path is configured
pub fn coordinates_file() -> PathBuf {
    config_dir().join("coordinates.json")
}
