// 公共错误类型
// 存储层错误在各服务之间共享，其余错误定义在各自模块中

use thiserror::Error;

/// 文档存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 存储暂时不可用（连接失败、忙等），可重试
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// 存储锁中毒：持锁线程曾 panic，重试不会恢复
    #[error("document store lock poisoned: {0}")]
    Poisoned(String),

    /// 单次调用超过了重试策略给定的时限
    #[error("document store call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// 文档内容无法解析为预期结构
    #[error("corrupt document {collection}/{key}: {source}")]
    Corrupt {
        collection: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// 对非数组字段执行数组操作等非法写入
    #[error("invalid write to {collection}/{key}: {reason}")]
    InvalidWrite {
        collection: String,
        key: String,
        reason: String,
    },

    /// 仅创建写入的目标文档已存在
    #[error("document {collection}/{key} already exists")]
    AlreadyExists { collection: String, key: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// 是否值得重试
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) | StoreError::Timeout(_) => true,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned(err.to_string())
    }
}
