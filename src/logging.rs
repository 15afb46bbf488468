// 日志初始化：stderr 与数据目录下的日志文件

use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs;
use std::path::Path;

pub fn init(level: LevelFilter, log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // rusqlite 等依赖的调试输出太多
        .level_for("rusqlite", LevelFilter::Warn)
        .chain(std::io::stderr())
        .chain(
            fern::log_file(log_file)
                .with_context(|| format!("failed to open log file {}", log_file.display()))?,
        )
        .apply()
        .context("logger already initialized")?;

    Ok(())
}
