pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

pub use commands::{dispatch, AppState, Request, Response};
pub use config::AppConfig;
pub use error::StoreError;
