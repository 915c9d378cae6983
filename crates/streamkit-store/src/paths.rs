//! Location of the configuration documents.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

/// Directory name of the application data folder.
pub const APP_DIR_NAME: &str = "streamkit";

/// Subdirectory of the data folder holding the store documents.
pub const CONFIG_DIR_NAME: &str = "Config";

/// Per-user application data directory.
pub fn default_data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Directory holding the store documents under a data directory.
pub fn config_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_DIR_NAME)
}

/// Path of a named store document under a data directory.
pub fn document_path(data_dir: &Path, name: &str) -> PathBuf {
    config_dir(data_dir).join(format!("{name}.json"))
}
