// 命令模块
// 提供供前端调用的命令接口，返回 Result<T, String>

pub mod admin;
pub mod dispatch;
pub mod problems;
pub mod progress;
pub mod state;

pub use dispatch::{dispatch, handle_line, serve, Command, Request, Response};

pub use state::{AdminForm, AppState, DashboardCache, Session, DASHBOARD_CACHE_CAPACITY};

pub use problems::{CatalogEntryDto, CatalogProblemDto};
