use crate::errors::Result;
use directories::BaseDirs;
use std::path::{Path, PathBuf};

pub(crate) fn get_main_dir() -> PathBuf {
    let base_dir: BaseDirs = BaseDirs::new().unwrap();
    let user_data_dir: &Path = base_dir.data_dir();
    let package_root: PathBuf = user_data_dir.join("coderoom");
    if !package_root.exists() {
        std::fs::create_dir_all(&package_root).unwrap();
    }
    package_root
}

pub(crate) fn get_user_db_dir() -> Result<PathBuf> {
    let main_dir = get_main_dir();
    Ok(main_dir.join("users.db"))
}

pub(crate) fn get_workspace_db_dir() -> Result<PathBuf> {
    let main_dir = get_main_dir();
    Ok(main_dir.join("workspaces.db"))
}

/// Scratch directory a session run materializes its workspace into.
pub(crate) fn get_session_dir(workspace_name: &str) -> Result<PathBuf> {
    let main_dir = get_main_dir();
    let session_dir = main_dir.join("sessions").join(workspace_name);
    if !session_dir.exists() {
        std::fs::create_dir_all(&session_dir)?;
    }
    Ok(session_dir)
}

pub(crate) fn get_log_dir() -> Result<PathBuf> {
    let main_dir = get_main_dir();
    let log_dir = main_dir.join("logs");
    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)?;
    }
    Ok(log_dir)
}
