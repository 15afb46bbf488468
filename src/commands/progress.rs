//! 用户进度命令

use crate::commands::state::AppState;
use crate::models::UserProgress;
use crate::services::auth::{AuthError, Identity};
use crate::services::progress::{Dashboard, Reaction};

fn signed_in(identity: Option<&Identity>) -> Result<&Identity, String> {
    identity.ok_or_else(|| AuthError::NotSignedIn.to_string())
}

pub async fn get_progress(
    state: &AppState,
    identity: Option<&Identity>,
) -> Result<UserProgress, String> {
    let user = signed_in(identity)?;
    state
        .progress
        .get_progress(&user.uid)
        .await
        .map_err(|e| e.to_string())
}

pub async fn set_reaction(
    state: &AppState,
    identity: Option<&Identity>,
    problem_id: &str,
    reaction: Reaction,
) -> Result<UserProgress, String> {
    let user = signed_in(identity)?;
    state
        .progress
        .set_reaction(&user.uid, problem_id, reaction)
        .await
        .map_err(|e| {
            log::warn!("reaction on {} for {} not saved: {}", problem_id, user.uid, e);
            e.to_string()
        })
}

pub async fn toggle_star(
    state: &AppState,
    identity: Option<&Identity>,
    problem_id: &str,
) -> Result<bool, String> {
    let user = signed_in(identity)?;
    state
        .progress
        .toggle_star(&user.uid, problem_id)
        .await
        .map_err(|e| {
            log::warn!("star on {} for {} not saved: {}", problem_id, user.uid, e);
            e.to_string()
        })
}

/// 存储不可用时返回上次成功的结果，没有则返回空仪表盘
pub async fn get_dashboard(
    state: &AppState,
    identity: Option<&Identity>,
) -> Result<Dashboard, String> {
    let user = signed_in(identity)?;
    match state.progress.dashboard(&user.uid).await {
        Ok(dashboard) => {
            state.remember_dashboard(&user.uid, &dashboard);
            Ok(dashboard)
        }
        Err(e) => {
            log::warn!("dashboard for {} unavailable, serving last snapshot: {}", user.uid, e);
            Ok(state.last_dashboard(&user.uid).unwrap_or_default())
        }
    }
}
