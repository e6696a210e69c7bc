//! Where the configuration file lives.
//!
//! `CAMTRAP_CONFIG` names the file directly; otherwise it is
//! `config.toml` in the platform configuration directory
//! (`~/.config/camtrap/` on Linux, `~/Library/Application Support/camtrap/`
//! on macOS, `%APPDATA%\camtrap\` on Windows).

use crate::constants::{APP_NAME, CONFIG_FILE_NAME, CONFIG_PATH_ENV};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::ffi::OsString;
use std::path::PathBuf;

/// Path of the configuration file for this process.
pub fn config_file_path() -> Result<PathBuf> {
    resolve_config_path(std::env::var_os(CONFIG_PATH_ENV))
}

/// Pick the configuration file from an explicit override or the platform default.
///
/// An empty override counts as unset.
pub fn resolve_config_path(override_path: Option<OsString>) -> Result<PathBuf> {
    match override_path.filter(|p| !p.is_empty()) {
        Some(path) => Ok(PathBuf::from(path)),
        None => platform_config_path(),
    }
}

fn platform_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", APP_NAME).ok_or(Error::ConfigDirNotFound)?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}
