// 应用配置
// 默认值 + 环境变量覆盖

use crate::services::runner::RunnerConfig;
use crate::services::sandbox::SandboxConfig;
use crate::services::store_client::RetryPolicy;
use crate::utils;
use anyhow::{anyhow, bail, Context, Result};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "PRACTICE_HUB_DATA_DIR";
pub const ENV_ADMIN_EMAILS: &str = "PRACTICE_HUB_ADMIN_EMAILS";
pub const ENV_LOG: &str = "PRACTICE_HUB_LOG";
pub const ENV_SANDBOX_CMD: &str = "PRACTICE_HUB_SANDBOX_CMD";
pub const ENV_SANDBOX_TIMEOUT_MS: &str = "PRACTICE_HUB_SANDBOX_TIMEOUT_MS";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub admin_emails: Vec<String>,
    pub log_level: LevelFilter,
    pub retry: RetryPolicy,
    pub sandbox: SandboxConfig,
    pub runner: RunnerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: utils::default_data_dir(),
            admin_emails: Vec::new(),
            log_level: LevelFilter::Info,
            retry: RetryPolicy::default(),
            sandbox: SandboxConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 按给定的查找函数应用覆盖，空值视为未设置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir.trim());
        }

        if let Some(emails) = get(ENV_ADMIN_EMAILS) {
            config.admin_emails = emails
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
        }

        if let Some(level) = get(ENV_LOG) {
            config.log_level = level
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid {} value '{}'", ENV_LOG, level))?;
        }

        if let Some(cmd) = get(ENV_SANDBOX_CMD) {
            config.sandbox.command = cmd.split_whitespace().map(str::to_string).collect();
        }

        if let Some(ms) = get(ENV_SANDBOX_TIMEOUT_MS) {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("invalid {} value '{}'", ENV_SANDBOX_TIMEOUT_MS, ms))?;
            if ms == 0 {
                bail!("{} must be greater than zero", ENV_SANDBOX_TIMEOUT_MS);
            }
            config.sandbox.timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        utils::database_path(&self.data_dir)
    }

    pub fn log_path(&self) -> PathBuf {
        utils::log_path(&self.data_dir)
    }
}
