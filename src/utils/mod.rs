use std::path::{Path, PathBuf};

#[cfg(target_os = "macos")]
const PLATFORM: &str = "macos";

#[cfg(target_os = "windows")]
const PLATFORM: &str = "windows";

#[cfg(target_os = "linux")]
const PLATFORM: &str = "linux";

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
const PLATFORM: &str = "unknown";

/// 可执行文件所在目录下的 data 目录
pub fn default_data_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("data")
}

pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("practice-hub.db")
}

pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("practice-hub.log")
}

pub fn get_platform() -> &'static str {
    PLATFORM
}
