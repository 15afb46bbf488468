// 题目记录服务
// 管理员表单写入 problems/<id>，题目列表、公司题目与仪表盘都从这里读取

use crate::error::StoreError;
use crate::models::{Difficulty, NewProblem, ProblemRecord};
use crate::services::auth::AdminGrant;
use crate::services::database::{Filter, PROBLEMS};
use crate::services::store_client::{encode, StoreClient};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// 表单中表示"不属于任何公司"的取值
pub const GENERAL_COMPANY: &str = "general";

#[derive(Debug, Error)]
pub enum ProblemStoreError {
    #[error("invalid problem id '{0}': use lowercase letters, digits and single dashes")]
    InvalidId(String),
    #[error("problem title must not be empty")]
    EmptyTitle,
    #[error("invalid order '{0}': expected a positive integer")]
    InvalidOrder(String),
    #[error("{0}")]
    InvalidDifficulty(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug pattern is valid"))
}

/// 公司名规范化：去空白并转大写
pub fn normalize_company(name: &str) -> String {
    name.trim().to_uppercase()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 校验表单并转换为题目记录
pub fn record_from_form(form: NewProblem) -> Result<ProblemRecord, ProblemStoreError> {
    let id = form.id.trim().to_string();
    if !slug_pattern().is_match(&id) {
        return Err(ProblemStoreError::InvalidId(id));
    }

    let title = form.title.trim().to_string();
    if title.is_empty() {
        return Err(ProblemStoreError::EmptyTitle);
    }

    let order = form
        .order
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|order| *order > 0)
        .ok_or_else(|| ProblemStoreError::InvalidOrder(form.order.clone()))?;

    let difficulty = form
        .difficulty
        .parse::<Difficulty>()
        .map_err(ProblemStoreError::InvalidDifficulty)?;

    let companies = match non_empty(form.company) {
        Some(company) if !company.eq_ignore_ascii_case(GENERAL_COMPANY) => {
            vec![normalize_company(&company)]
        }
        _ => Vec::new(),
    };

    Ok(ProblemRecord {
        id,
        title,
        difficulty,
        category: form.category.trim().to_string(),
        order,
        video_id: non_empty(form.video_id),
        link: non_empty(form.link),
        likes: 0,
        dislikes: 0,
        companies,
    })
}

/// 题目记录仓库
#[derive(Clone)]
pub struct ProblemStore {
    client: StoreClient,
}

impl ProblemStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// 管理员添加题目（同 id 覆盖）
    pub async fn add_problem(
        &self,
        grant: &AdminGrant,
        form: NewProblem,
    ) -> Result<ProblemRecord, ProblemStoreError> {
        let record = record_from_form(form)?;
        let doc = encode(PROBLEMS, &record.id, &record)?;
        self.client.set(PROBLEMS, &record.id, doc).await?;

        log::info!(
            "problem {} (order {}) saved by {}",
            record.id,
            record.order,
            grant.uid()
        );
        Ok(record)
    }

    pub async fn get_problem(&self, id: &str) -> Result<Option<ProblemRecord>, StoreError> {
        self.client.get_as(PROBLEMS, id).await
    }

    /// 全部题目，按 order 排序
    pub async fn list_problems(&self) -> Result<Vec<ProblemRecord>, StoreError> {
        let mut problems: Vec<ProblemRecord> = self.client.query_as(PROBLEMS, Filter::All).await?;
        problems.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(problems)
    }

    /// 属于某公司的题目
    pub async fn problems_for_company(&self, name: &str) -> Result<Vec<ProblemRecord>, StoreError> {
        let mut problems: Vec<ProblemRecord> = self
            .client
            .query_as(PROBLEMS, Filter::array_contains("companies", normalize_company(name)))
            .await?;
        problems.sort_by_key(|p| p.order);
        Ok(problems)
    }

    /// 批量读取；已不存在的 id 直接略过，结果顺序与传入顺序一致
    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<ProblemRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<ProblemRecord> = self
            .client
            .query_as(PROBLEMS, Filter::is_in("id", ids.iter().cloned()))
            .await?;
        let mut by_id: HashMap<String, ProblemRecord> =
            found.into_iter().map(|p| (p.id.clone(), p)).collect();

        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.remove(id) {
                Some(problem) => resolved.push(problem),
                None => log::debug!("problem {} no longer exists, skipped", id),
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::MemoryStore;
    use crate::services::store_client::RetryPolicy;
    use std::sync::Arc;

    fn store() -> ProblemStore {
        ProblemStore::new(StoreClient::new(
            Arc::new(MemoryStore::new()),
            RetryPolicy::no_retry(),
        ))
    }

    fn form(id: &str, order: &str, company: Option<&str>) -> NewProblem {
        NewProblem {
            id: id.to_string(),
            title: format!("Title of {}", id),
            difficulty: "Easy".to_string(),
            category: "Array".to_string(),
            order: order.to_string(),
            video_id: Some("  ".to_string()),
            link: None,
            company: company.map(str::to_string),
        }
    }

    #[test]
    fn test_form_validation() {
        assert!(matches!(
            record_from_form(form("Two Sum", "1", None)),
            Err(ProblemStoreError::InvalidId(_))
        ));
        assert!(matches!(
            record_from_form(form("two-sum", "first", None)),
            Err(ProblemStoreError::InvalidOrder(_))
        ));
        assert!(matches!(
            record_from_form(form("two-sum", "0", None)),
            Err(ProblemStoreError::InvalidOrder(_))
        ));

        let mut bad = form("two-sum", "1", None);
        bad.difficulty = String::new();
        assert!(matches!(
            record_from_form(bad),
            Err(ProblemStoreError::InvalidDifficulty(_))
        ));
    }

    #[test]
    fn test_company_selection() {
        let general = record_from_form(form("a", "1", Some("general"))).unwrap();
        assert!(general.companies.is_empty());

        let none = record_from_form(form("a", "1", None)).unwrap();
        assert!(none.companies.is_empty());

        let acme = record_from_form(form("a", "1", Some(" acme "))).unwrap();
        assert_eq!(acme.companies, vec!["ACME"]);
        assert_eq!(acme.video_id, None);
    }

    #[tokio::test]
    async fn test_add_then_fetch_round_trip() {
        let store = store();
        let grant = AdminGrant::for_tests();

        let written = store
            .add_problem(&grant, form("two-sum", "3", Some("Google")))
            .await
            .unwrap();
        let fetched = store.get_problem("two-sum").await.unwrap().unwrap();

        assert_eq!(fetched, written);
        assert_eq!(fetched.id, "two-sum");
        assert_eq!(fetched.title, "Title of two-sum");
        assert_eq!(fetched.difficulty, Difficulty::Easy);
        assert_eq!(fetched.order, 3);
        assert!(store.get_problem("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_and_company_filter() {
        let store = store();
        let grant = AdminGrant::for_tests();
        store.add_problem(&grant, form("c", "3", Some("ACME"))).await.unwrap();
        store.add_problem(&grant, form("a", "1", Some("acme"))).await.unwrap();
        store.add_problem(&grant, form("b", "2", None)).await.unwrap();

        let ids: Vec<String> = store.list_problems().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let acme: Vec<String> = store
            .problems_for_company("Acme")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(acme, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_get_many_skips_dangling_ids() {
        let store = store();
        let grant = AdminGrant::for_tests();
        store.add_problem(&grant, form("a", "1", None)).await.unwrap();
        store.add_problem(&grant, form("b", "2", None)).await.unwrap();

        let ids = vec!["b".to_string(), "deleted".to_string(), "a".to_string()];
        let resolved: Vec<String> = store.get_many(&ids).await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(resolved, vec!["b", "a"]);
        assert!(store.get_many(&[]).await.unwrap().is_empty());
    }
}
