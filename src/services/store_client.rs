// 存储客户端
// 把同步的 DocumentStore 搬到阻塞线程池执行，并提供超时与指数退避重试

use crate::error::StoreError;
use crate::services::database::{DocumentStore, Filter, Write};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// 重试策略
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// 单次调用的时限
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// 不重试，用于测试或只读诊断
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// 第 `attempt` 次失败后的等待时间（attempt 从 1 开始）
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

/// 带重试的异步存储客户端
#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl StoreClient {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn call<T, F>(&self, op: &str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: Fn(&dyn DocumentStore) -> Result<T, StoreError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let store = Arc::clone(&self.store);
            let f = Arc::clone(&f);
            let task = tokio::task::spawn_blocking(move || f(store.as_ref()));

            let result = match tokio::time::timeout(self.policy.attempt_timeout, task).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(StoreError::Unavailable(format!(
                    "store task failed: {}",
                    join_err
                ))),
                Err(_) => Err(StoreError::Timeout(self.policy.attempt_timeout)),
            };

            match result {
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    log::warn!(
                        "store {} failed (attempt {}/{}): {}; retrying in {:?}",
                        op,
                        attempt,
                        self.policy.max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    log::error!("store {} failed after {} attempt(s): {}", op, attempt, err);
                    return Err(err);
                }
                ok => return ok,
            }
        }
    }

    pub async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.call("get", move |s| s.get(&collection, &key)).await
    }

    /// 读取并反序列化文档
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        self.get(collection, key)
            .await?
            .map(|doc| decode(collection, key, doc))
            .transpose()
    }

    pub async fn query(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let collection = collection.to_string();
        self.call("query", move |s| s.query(&collection, &filter)).await
    }

    pub async fn query_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<Vec<T>, StoreError> {
        self.query(collection, filter)
            .await?
            .into_iter()
            .map(|(key, doc)| decode(collection, &key, doc))
            .collect()
    }

    pub async fn set(&self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError> {
        self.commit(vec![Write::set(collection, key, doc)]).await
    }

    /// 仅在文档不存在时写入，已存在时返回 `StoreError::AlreadyExists`
    pub async fn create(&self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError> {
        self.commit(vec![Write::create(collection, key, doc)]).await
    }

    pub async fn set_as<T: Serialize>(
        &self,
        collection: &str,
        key: &str,
        doc: &T,
    ) -> Result<(), StoreError> {
        let doc = encode(collection, key, doc)?;
        self.set(collection, key, doc).await
    }

    pub async fn array_union(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StoreError> {
        self.commit(vec![Write::array_union(collection, key, field, values)])
            .await
    }

    pub async fn array_remove(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StoreError> {
        self.commit(vec![Write::array_remove(collection, key, field, values)])
            .await
    }

    pub async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.commit(vec![Write::delete(collection, key)]).await
    }

    /// 原子提交一组写操作
    pub async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        self.call("commit", move |s| s.commit(writes.clone())).await
    }
}

/// 把文档反序列化为具体类型
pub fn decode<T: DeserializeOwned>(collection: &str, key: &str, doc: Value) -> Result<T, StoreError> {
    serde_json::from_value(doc).map_err(|source| StoreError::Corrupt {
        collection: collection.to_string(),
        key: key.to_string(),
        source,
    })
}

/// 把具体类型序列化为文档
pub fn encode<T: Serialize>(collection: &str, key: &str, doc: &T) -> Result<Value, StoreError> {
    serde_json::to_value(doc).map_err(|e| StoreError::InvalidWrite {
        collection: collection.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    })
}
