use crate::config;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Ensure the parent directory of a *file path* exists (no-op if none).
pub fn ensure_parent_dir<P: AsRef<Path>>(file_path: P) -> io::Result<()> {
    if let Some(parent) = file_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Absolute path of the SQLite database file, from `config::database_path()`.
/// If relative in env, resolve against current_dir().
pub fn database_file() -> PathBuf {
    let p = PathBuf::from(config::database_path());
    if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(p)
    }
}

/// Turn `DATABASE_PATH` into a sea-orm URL.
///
/// DSNs are passed through untouched; plain file paths get their parent
/// directory created (SQLite won't create intermediate dirs) and `mode=rwc`.
pub fn database_url(path_or_url: &str) -> io::Result<String> {
    if path_or_url.starts_with("sqlite:") {
        return Ok(path_or_url.to_string());
    }
    ensure_parent_dir(path_or_url)?;
    Ok(format!("sqlite://{path_or_url}?mode=rwc"))
}
