// src/infra/paths.rs — Config and data locations
//
// FLOWING_HOME overrides everything. Otherwise config lives in ~/.flowing/
// and traces/reports land in the XDG data directory.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

fn flowing_home() -> Option<PathBuf> {
    std::env::var_os("FLOWING_HOME").map(PathBuf::from)
}

/// Home directory, or the current directory when it cannot be determined.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $FLOWING_HOME/ or ~/.flowing/
pub fn config_dir() -> PathBuf {
    if let Some(home) = flowing_home() {
        return home;
    }
    dirs_home().join(".flowing")
}

/// Data directory: $FLOWING_HOME/data/ or ~/.local/share/flowing/
pub fn data_dir() -> PathBuf {
    if let Some(home) = flowing_home() {
        return home.join("data");
    }
    ProjectDirs::from("", "", "flowing")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| config_dir().join("data"))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Trace recordings
pub fn traces_dir() -> PathBuf {
    data_dir().join("traces")
}
