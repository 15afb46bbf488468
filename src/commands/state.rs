// 应用状态：命令层共享的服务实例

use crate::config::AppConfig;
use crate::services::admin_flow::{AdminFlow, FlowState};
use crate::services::auth::{AccessPolicy, Identity};
use crate::services::catalog::Catalog;
use crate::services::companies::CompanyDirectory;
use crate::services::database::{DocumentStore, SqliteStore};
use crate::services::problem_store::ProblemStore;
use crate::services::progress::{Dashboard, ProgressStore};
use crate::services::runner::{CancelToken, ValidationRunner};
use crate::services::sandbox::Sandbox;
use crate::services::store_client::StoreClient;
use crate::services::submission::Submissions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 仪表盘快照缓存最多保留的用户数
pub const DASHBOARD_CACHE_CAPACITY: usize = 256;

/// 每个用户最近一次成功加载的仪表盘；满了淘汰最早写入的一项
#[derive(Debug)]
pub struct DashboardCache {
    capacity: usize,
    tick: u64,
    entries: HashMap<String, (u64, Dashboard)>,
}

impl DashboardCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, uid: &str, dashboard: Dashboard) {
        self.tick += 1;
        if !self.entries.contains_key(uid) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (stamp, _))| *stamp)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
        self.entries.insert(uid.to_string(), (self.tick, dashboard));
    }

    pub fn get(&self, uid: &str) -> Option<&Dashboard> {
        self.entries.get(uid).map(|(_, dashboard)| dashboard)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 管理员表单种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminForm {
    AddProblem,
    AddCompany,
}

/// 身份提供方给出的登录信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}

pub struct AppState {
    pub catalog: &'static Catalog,
    pub problems: ProblemStore,
    pub companies: CompanyDirectory,
    pub progress: ProgressStore,
    pub submissions: Submissions,
    pub policy: AccessPolicy,
    pub cancel: CancelToken,
    flows: Mutex<HashMap<(String, AdminForm), AdminFlow>>,
    dashboards: Mutex<DashboardCache>,
}

impl AppState {
    /// 打开数据目录下的 SQLite 存储
    pub fn open(config: &AppConfig, cancel: CancelToken) -> Result<Self> {
        let path = config.database_path();
        let store = SqliteStore::open(&path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        log::info!("document store opened at {}", path.display());
        Self::with_store(Arc::new(store), config, cancel)
    }

    pub fn with_store(
        store: Arc<dyn DocumentStore>,
        config: &AppConfig,
        cancel: CancelToken,
    ) -> Result<Self> {
        let catalog = Catalog::builtin().context("failed to build problem catalog")?;
        let client = StoreClient::new(store, config.retry.clone());
        let progress = ProgressStore::new(client.clone());
        let submissions = Submissions::new(
            catalog,
            ValidationRunner::new(config.runner.clone()),
            Arc::new(Sandbox::new(config.sandbox.clone())),
            progress.clone(),
        );

        Ok(Self {
            catalog,
            problems: ProblemStore::new(client.clone()),
            companies: CompanyDirectory::new(client),
            progress,
            submissions,
            policy: AccessPolicy::new(&config.admin_emails),
            cancel,
            flows: Mutex::new(HashMap::new()),
            dashboards: Mutex::new(DashboardCache::new(DASHBOARD_CACHE_CAPACITY)),
        })
    }

    pub fn identity(&self, session: Option<&Session>) -> Option<Identity> {
        session.map(|s| self.policy.resolve(&s.uid, s.email.as_deref()))
    }

    /// 对某个表单状态机执行一次转换，返回转换后的状态
    pub fn with_flow<F>(&self, uid: &str, form: AdminForm, f: F) -> Result<FlowState, String>
    where
        F: FnOnce(&mut AdminFlow) -> Result<(), String>,
    {
        let mut flows = self.flows.lock().map_err(|e| e.to_string())?;
        let flow = flows.entry((uid.to_string(), form)).or_default();
        f(flow)?;
        Ok(flow.state().clone())
    }

    pub fn remember_dashboard(&self, uid: &str, dashboard: &Dashboard) {
        if let Ok(mut cache) = self.dashboards.lock() {
            cache.insert(uid, dashboard.clone());
        }
    }

    /// 最近一次成功加载的仪表盘
    pub fn last_dashboard(&self, uid: &str) -> Option<Dashboard> {
        self.dashboards
            .lock()
            .ok()
            .and_then(|cache| cache.get(uid).cloned())
    }
}
