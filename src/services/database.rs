// 文档存储模块
// 以"集合 + 文档键"寻址 JSON 文档，提供 SQLite 实现与内存实现

use crate::error::StoreError;
use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 题目记录集合
pub const PROBLEMS: &str = "problems";
/// 公司名称列表聚合所在集合
pub const COMPANIES: &str = "companies";
/// 公司名称列表聚合的文档键
pub const COMPANY_LIST_KEY: &str = "list";
/// 公司名称列表聚合中的数组字段
pub const COMPANY_LIST_FIELD: &str = "names";
/// 公司详情集合，每个公司一个文档
pub const COMPANIES_DETAILS: &str = "companiesDetails";
/// 用户进度集合
pub const USERS: &str = "users";

/// 查询过滤条件
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// 字段等于给定值
    Eq { field: String, value: Value },
    /// 数组字段包含给定值
    ArrayContains { field: String, value: Value },
    /// 字段取值属于给定集合
    In { field: String, values: Vec<Value> },
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn array_contains(field: &str, value: impl Into<Value>) -> Self {
        Filter::ArrayContains {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn is_in<I, V>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// 判断文档是否满足条件
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => doc.get(field) == Some(value),
            Filter::ArrayContains { field, value } => doc
                .get(field)
                .and_then(Value::as_array)
                .map_or(false, |items| items.contains(value)),
            Filter::In { field, values } => doc
                .get(field)
                .map_or(false, |actual| values.contains(actual)),
        }
    }
}

/// 单条写操作，`commit` 以原子方式应用一组写操作
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// 整体写入（upsert）
    Set {
        collection: String,
        key: String,
        doc: Value,
    },
    /// 仅当文档不存在时写入，否则整个提交以 `StoreError::AlreadyExists` 失败
    Create {
        collection: String,
        key: String,
        doc: Value,
    },
    /// 数组字段并集；文档或字段不存在时创建
    ArrayUnion {
        collection: String,
        key: String,
        field: String,
        values: Vec<Value>,
    },
    /// 从数组字段移除给定值；文档不存在时不做任何事
    ArrayRemove {
        collection: String,
        key: String,
        field: String,
        values: Vec<Value>,
    },
    Delete { collection: String, key: String },
}

impl Write {
    pub fn set(collection: &str, key: &str, doc: Value) -> Self {
        Write::Set {
            collection: collection.to_string(),
            key: key.to_string(),
            doc,
        }
    }

    pub fn create(collection: &str, key: &str, doc: Value) -> Self {
        Write::Create {
            collection: collection.to_string(),
            key: key.to_string(),
            doc,
        }
    }

    pub fn array_union(collection: &str, key: &str, field: &str, values: Vec<Value>) -> Self {
        Write::ArrayUnion {
            collection: collection.to_string(),
            key: key.to_string(),
            field: field.to_string(),
            values,
        }
    }

    pub fn array_remove(collection: &str, key: &str, field: &str, values: Vec<Value>) -> Self {
        Write::ArrayRemove {
            collection: collection.to_string(),
            key: key.to_string(),
            field: field.to_string(),
            values,
        }
    }

    pub fn delete(collection: &str, key: &str) -> Self {
        Write::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }
}

/// 文档存储接口
///
/// 实现为同步调用；异步、超时与重试由 `StoreClient` 负责。
pub trait DocumentStore: Send + Sync + 'static {
    /// 按键读取文档，不存在时返回 `None`
    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// 按条件查询，结果按文档键升序
    fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<(String, Value)>, StoreError>;

    /// 原子地应用一组写操作：要么全部生效，要么全部不生效
    fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError>;

    fn set(&self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError> {
        self.commit(vec![Write::set(collection, key, doc)])
    }

    fn array_union(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StoreError> {
        self.commit(vec![Write::array_union(collection, key, field, values)])
    }

    fn array_remove(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StoreError> {
        self.commit(vec![Write::array_remove(collection, key, field, values)])
    }

    fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.commit(vec![Write::delete(collection, key)])
    }
}

/// 计算数组操作后的新文档；返回 `None` 表示文档保持不存在
fn merge_array(
    collection: &str,
    key: &str,
    current: Option<Value>,
    field: &str,
    values: &[Value],
    union: bool,
) -> Result<Option<Value>, StoreError> {
    let mut doc = match current {
        Some(doc) => doc,
        None if union => Value::Object(Map::new()),
        None => return Ok(None),
    };

    let object = doc.as_object_mut().ok_or_else(|| StoreError::InvalidWrite {
        collection: collection.to_string(),
        key: key.to_string(),
        reason: "document is not an object".to_string(),
    })?;

    let slot = object
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let items = slot.as_array_mut().ok_or_else(|| StoreError::InvalidWrite {
        collection: collection.to_string(),
        key: key.to_string(),
        reason: format!("field '{}' is not an array", field),
    })?;

    if union {
        for value in values {
            if !items.contains(value) {
                items.push(value.clone());
            }
        }
    } else {
        items.retain(|item| !values.contains(item));
    }

    Ok(Some(doc))
}

// ==================== SQLite 实现 ====================

/// 基于 SQLite 的文档存储
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// 打开（必要时创建）数据库文件
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "Failed to create data dir {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize(true)?;
        Ok(store)
    }

    /// 内存数据库，主要用于测试
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.initialize(false)?;
        Ok(store)
    }

    /// 初始化表结构
    fn initialize(&self, wal: bool) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;

        if wal {
            // journal_mode 会返回一行结果
            let _mode: String =
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
        }

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
        ",
        )?;

        Ok(())
    }

    fn parse_body(collection: &str, key: &str, body: &str) -> Result<Value, StoreError> {
        serde_json::from_str(body).map_err(|source| StoreError::Corrupt {
            collection: collection.to_string(),
            key: key.to_string(),
            source,
        })
    }

    fn read(conn: &Connection, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                rusqlite::params![collection, key],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|b| Self::parse_body(collection, key, &b))
            .transpose()
    }

    fn upsert(conn: &Connection, collection: &str, key: &str, doc: &Value) -> Result<(), StoreError> {
        conn.execute(
            "INSERT OR REPLACE INTO documents (collection, key, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![collection, key, doc.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// 主键冲突时返回 `AlreadyExists`
    fn insert(conn: &Connection, collection: &str, key: &str, doc: &Value) -> Result<(), StoreError> {
        let result = conn.execute(
            "INSERT INTO documents (collection, key, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![collection, key, doc.to_string(), Utc::now().to_rfc3339()],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::AlreadyExists {
                    collection: collection.to_string(),
                    key: key.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn.lock()?;
        Self::read(&conn, collection, key)
    }

    fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<(String, Value)>, StoreError> {
        let conn = self.conn.lock()?;

        let mut stmt =
            conn.prepare("SELECT key, body FROM documents WHERE collection = ?1 ORDER BY key")?;
        let rows = stmt.query_map(rusqlite::params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (key, body) = row?;
            let doc = Self::parse_body(collection, &key, &body)?;
            if filter.matches(&doc) {
                docs.push((key, doc));
            }
        }

        Ok(docs)
    }

    fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;

        for write in &writes {
            match write {
                Write::Set {
                    collection,
                    key,
                    doc,
                } => Self::upsert(&tx, collection, key, doc)?,
                Write::Create {
                    collection,
                    key,
                    doc,
                } => Self::insert(&tx, collection, key, doc)?,
                Write::ArrayUnion {
                    collection,
                    key,
                    field,
                    values,
                }
                | Write::ArrayRemove {
                    collection,
                    key,
                    field,
                    values,
                } => {
                    let union = matches!(write, Write::ArrayUnion { .. });
                    let current = Self::read(&tx, collection, key)?;
                    if let Some(doc) = merge_array(collection, key, current, field, values, union)? {
                        Self::upsert(&tx, collection, key, &doc)?;
                    }
                }
                Write::Delete { collection, key } => {
                    tx.execute(
                        "DELETE FROM documents WHERE collection = ?1 AND key = ?2",
                        rusqlite::params![collection, key],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}

// ==================== 内存实现 ====================

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// 内存文档存储，支持注入故障以模拟存储不可用
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    failures_pending: AtomicUsize,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接下来的 `count` 次调用都返回 `StoreError::Unavailable`
    pub fn fail_next(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// 已收到的调用次数（含失败的调用）
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn apply(collections: &mut Collections, write: Write) -> Result<(), StoreError> {
        match write {
            Write::Set {
                collection,
                key,
                doc,
            } => {
                collections.entry(collection).or_default().insert(key, doc);
            }
            Write::Create {
                collection,
                key,
                doc,
            } => {
                let docs = collections.entry(collection.clone()).or_default();
                if docs.contains_key(&key) {
                    return Err(StoreError::AlreadyExists { collection, key });
                }
                docs.insert(key, doc);
            }
            Write::ArrayUnion {
                collection,
                key,
                field,
                values,
            } => {
                let docs = collections.entry(collection.clone()).or_default();
                let current = docs.remove(&key);
                if let Some(doc) = merge_array(&collection, &key, current, &field, &values, true)? {
                    docs.insert(key, doc);
                }
            }
            Write::ArrayRemove {
                collection,
                key,
                field,
                values,
            } => {
                let docs = collections.entry(collection.clone()).or_default();
                let current = docs.remove(&key);
                if let Some(doc) = merge_array(&collection, &key, current, &field, &values, false)? {
                    docs.insert(key, doc);
                }
            }
            Write::Delete { collection, key } => {
                if let Some(docs) = collections.get_mut(&collection) {
                    docs.remove(&key);
                }
            }
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        self.enter()?;
        let collections = self.collections.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<(String, Value)>, StoreError> {
        self.enter()?;
        let collections = self.collections.lock()?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| filter.matches(doc))
                    .map(|(key, doc)| (key.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        self.enter()?;
        let mut collections = self.collections.lock()?;

        // 在副本上应用，全部成功后再替换
        let mut staged = collections.clone();
        for write in writes {
            Self::apply(&mut staged, write)?;
        }
        *collections = staged;

        Ok(())
    }
}
