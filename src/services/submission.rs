// 提交流程：签名检查 → 沙箱判题 → 通过后记录已解决

use crate::services::auth::Identity;
use crate::services::catalog::{entry_point, Catalog};
use crate::services::progress::ProgressStore;
use crate::services::runner::{CancelToken, ValidationRunner, Verdict};
use crate::services::sandbox::{Sandbox, SandboxCandidate};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("unknown problem '{0}'")]
    UnknownProblem(String),
    #[error("the function signature `{0}` was modified or removed")]
    SignatureTampered(String),
    #[error("problem '{0}' has no callable entry point")]
    NoEntryPoint(String),
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub problem_id: String,
    pub verdict: Verdict,
    /// 通过且已写入用户进度
    pub recorded: bool,
}

#[derive(Clone)]
pub struct Submissions {
    catalog: &'static Catalog,
    runner: ValidationRunner,
    sandbox: Arc<Sandbox>,
    progress: ProgressStore,
}

impl Submissions {
    pub fn new(
        catalog: &'static Catalog,
        runner: ValidationRunner,
        sandbox: Arc<Sandbox>,
        progress: ProgressStore,
    ) -> Self {
        Self {
            catalog,
            runner,
            sandbox,
            progress,
        }
    }

    pub async fn submit(
        &self,
        identity: Option<&Identity>,
        problem_id: &str,
        source: &str,
        cancel: &CancelToken,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let problem = self
            .catalog
            .lookup(problem_id)
            .ok_or_else(|| SubmissionError::UnknownProblem(problem_id.to_string()))?;

        if !source.contains(problem.starter_function_name) {
            return Err(SubmissionError::SignatureTampered(
                problem.starter_function_name.to_string(),
            ));
        }
        let entry = entry_point(problem)
            .ok_or_else(|| SubmissionError::NoEntryPoint(problem_id.to_string()))?;

        let candidate = SandboxCandidate::new(Arc::clone(&self.sandbox), source, entry);
        let verdict = self.runner.validate(&candidate, problem, cancel).await;

        let mut recorded = false;
        if verdict.is_pass() {
            if let Some(identity) = identity {
                // 写入失败只记录日志，不影响判题结果
                match self.progress.mark_solved(&identity.uid, problem.id).await {
                    Ok(()) => recorded = true,
                    Err(e) => log::warn!(
                        "could not record {} as solved for {}: {}",
                        problem.id,
                        identity.uid,
                        e
                    ),
                }
            }
        }

        match verdict.failure() {
            None => log::info!("submission for {} passed", problem.id),
            Some(failure) => log::info!(
                "submission for {} failed at case {}",
                problem.id,
                failure.index
            ),
        }

        Ok(SubmissionOutcome {
            problem_id: problem.id.to_string(),
            verdict,
            recorded,
        })
    }
}
