//! Path utilities for ddebug
//!
//! Program name detection, output folder naming and temporary/config
//! locations. Works cross-platform.

use std::env;
use std::path::{Path, PathBuf};

use crate::constants::{
    CONFIG_DIR_NAME, DEFAULT_CONFIG_FILENAME, ENV_TEMP, ENV_TMPDIR, FALLBACK_PROGRAM_NAME,
    OUTPUT_FOLDER_DATE_FORMAT, OUTPUT_FOLDER_SUFFIX, TEMP_LOG_FILENAME,
};

/// Path of the running program.
///
/// Uses the current executable, then `argv[0]`, then `interactive`.
pub fn exec_path() -> PathBuf {
    if let Ok(path) = env::current_exe() {
        return path;
    }
    match env::args_os().next() {
        Some(arg) if !arg.is_empty() => PathBuf::from(arg),
        _ => PathBuf::from(FALLBACK_PROGRAM_NAME),
    }
}

/// File stem of `path`, or `interactive`.
pub fn program_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_PROGRAM_NAME)
        .to_string()
}

/// Default output folder name for `program`.
///
/// `<stem>_log`, or `<stem>_<%m-%d-%Y,%H-%M-%S>` when `with_date` is set.
pub fn output_folder_name(program: &Path, with_date: bool) -> String {
    let suffix = if with_date {
        chrono::Local::now()
            .format(OUTPUT_FOLDER_DATE_FORMAT)
            .to_string()
    } else {
        OUTPUT_FOLDER_SUFFIX.to_string()
    };
    format!("{}_{}", program_stem(program), suffix)
}

/// Default output folder for the running program, relative to the working directory.
pub fn default_output_folder(with_date: bool) -> PathBuf {
    PathBuf::from(output_folder_name(&exec_path(), with_date))
}

/// Temporary directory: `TMPDIR`, then `TEMP`, then the platform default.
pub fn temp_dir() -> PathBuf {
    for var in [ENV_TMPDIR, ENV_TEMP] {
        if let Ok(dir) = env::var(var) {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
    }
    env::temp_dir()
}

/// `<temp>/ddebug.txt`
pub fn temp_log_path() -> PathBuf {
    temp_dir().join(TEMP_LOG_FILENAME)
}

/// Per-user config file: `<config dir>/ddebug/ddebug.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(DEFAULT_CONFIG_FILENAME))
}

/// Ensure the parent directory of a path exists.
///
/// Creates all parent directories if they don't exist.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
