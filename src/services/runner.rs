//! 判题执行器
//! 依次把固定输入喂给候选实现并与期望输出严格比较，首个不一致即判失败

use crate::services::catalog::Problem;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// 候选实现调用失败
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandidateError {
    /// 候选代码自身抛出异常或 panic
    #[error("candidate raised: {0}")]
    Raised(String),
    /// 候选实现自行上报的超时（沙箱进程被终止）
    #[error("candidate timed out after {0:?}")]
    TimedOut(Duration),
    /// 沙箱进程本身出错（无法启动、输出不合法等）
    #[error("sandbox fault: {0}")]
    Sandbox(String),
}

/// 候选实现：给定参数返回一个输出
pub trait Candidate: Send + Sync {
    fn invoke<'a>(&'a self, args: &'a [Value]) -> BoxFuture<'a, Result<Value, CandidateError>>;
}

type CandidateFn = dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync;

/// 进程内的可信候选实现（参考解、测试）
#[derive(Clone)]
pub struct FnCandidate {
    f: Arc<CandidateFn>,
}

impl FnCandidate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

impl Candidate for FnCandidate {
    fn invoke<'a>(&'a self, args: &'a [Value]) -> BoxFuture<'a, Result<Value, CandidateError>> {
        let f = Arc::clone(&self.f);
        let args = args.to_vec();
        Box::pin(async move {
            // 在阻塞线程池执行，超时后线程会被放弃但不阻塞判题
            tokio::task::spawn_blocking(move || f(&args))
                .await
                .map_err(|e| CandidateError::Raised(format!("candidate panicked: {}", e)))?
                .map_err(CandidateError::Raised)
        })
    }
}

// ==================== 取消 ====================

/// 取消句柄，由发起方持有
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// 取消令牌，传入长时间运行的判题
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// 永不取消
    pub fn never() -> Self {
        let (_handle, token) = Self::new();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 取消时完成；句柄被丢弃后永远挂起
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

// ==================== 判题结果 ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureReason {
    /// 输出与期望不一致
    Mismatch,
    Raised { message: String },
    SandboxFault { message: String },
    TimedOut { after_ms: u64 },
    Cancelled,
}

/// 失败详情：哪一组输入、期望什么、实际得到什么
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub index: usize,
    pub args: Vec<Value>,
    pub expected: Value,
    pub actual: Option<Value>,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Verdict {
    Pass { vectors: usize },
    Fail(ValidationFailure),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass { .. })
    }

    pub fn failure(&self) -> Option<&ValidationFailure> {
        match self {
            Verdict::Fail(failure) => Some(failure),
            Verdict::Pass { .. } => None,
        }
    }
}

// ==================== 执行器 ====================

/// 判题时限
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// 单组输入的时限
    pub per_vector_timeout: Duration,
    /// 整道题的总时限
    pub total_budget: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            per_vector_timeout: Duration::from_secs(2),
            total_budget: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationRunner {
    config: RunnerConfig,
}

impl ValidationRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// 对题目的全部测试向量验证候选实现
    pub async fn validate(
        &self,
        candidate: &dyn Candidate,
        problem: &Problem,
        cancel: &CancelToken,
    ) -> Verdict {
        let vectors = problem.handler.vectors();
        let deadline = Instant::now() + self.config.total_budget;

        for (index, vector) in vectors.iter().enumerate() {
            let limit = self
                .config
                .per_vector_timeout
                .min(deadline.saturating_duration_since(Instant::now()));

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FailureReason::Cancelled),
                result = tokio::time::timeout(limit, candidate.invoke(&vector.args)) => match result {
                    Err(_) => Err(FailureReason::TimedOut {
                        after_ms: limit.as_millis() as u64,
                    }),
                    Ok(Err(CandidateError::Raised(message))) => Err(FailureReason::Raised { message }),
                    Ok(Err(CandidateError::TimedOut(after))) => Err(FailureReason::TimedOut {
                        after_ms: after.as_millis() as u64,
                    }),
                    Ok(Err(CandidateError::Sandbox(message))) => {
                        Err(FailureReason::SandboxFault { message })
                    }
                    Ok(Ok(actual)) => Ok(actual),
                },
            };

            let (actual, reason) = match outcome {
                Ok(actual) if actual == vector.expected => continue,
                Ok(actual) => (Some(actual), FailureReason::Mismatch),
                Err(reason) => (None, reason),
            };

            log::info!(
                "problem {} failed on vector {} ({:?}): {:?}",
                problem.id,
                index,
                vector.args,
                reason
            );

            return Verdict::Fail(ValidationFailure {
                index,
                args: vector.args.clone(),
                expected: vector.expected.clone(),
                actual,
                reason,
            });
        }

        log::info!("problem {} passed {} vectors", problem.id, vectors.len());
        Verdict::Pass {
            vectors: vectors.len(),
        }
    }
}
