// 公司目录
// companiesDetails/<NAME> 是唯一数据源；companies/list 聚合文档只为兼容旧读者而维护

use crate::error::StoreError;
use crate::models::{Company, CompanyDetails, ProblemRecord};
use crate::services::auth::AdminGrant;
use crate::services::database::{
    Filter, Write, COMPANIES, COMPANIES_DETAILS, COMPANY_LIST_FIELD, COMPANY_LIST_KEY, PROBLEMS,
};
use crate::services::problem_store::{normalize_company, ProblemStore};
use crate::services::store_client::{encode, StoreClient};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("company name must not be empty")]
    InvalidName,
    #[error("company {0} already exists")]
    AlreadyExists(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 批量删除结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    /// 本来就没有详情记录的名称
    pub not_found: Vec<String>,
    /// (公司名, 错误信息)
    pub failed: Vec<(String, String)>,
}

/// 一个题目引用了不存在的公司
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    pub problem_id: String,
    pub company: String,
}

/// 聚合文档、详情记录与题目引用之间的不一致
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    /// 聚合中有、详情中没有
    pub listed_without_details: Vec<String>,
    /// 详情中有、聚合中没有
    pub details_not_listed: Vec<String>,
    pub dangling_references: Vec<DanglingReference>,
}

impl DriftReport {
    pub fn is_consistent(&self) -> bool {
        self.listed_without_details.is_empty()
            && self.details_not_listed.is_empty()
            && self.dangling_references.is_empty()
    }
}

#[derive(Clone)]
pub struct CompanyDirectory {
    client: StoreClient,
    problems: ProblemStore,
}

impl CompanyDirectory {
    pub fn new(client: StoreClient) -> Self {
        Self {
            problems: ProblemStore::new(client.clone()),
            client,
        }
    }

    /// 添加公司：详情记录与聚合文档在同一次提交中写入
    pub async fn add_company(
        &self,
        grant: &AdminGrant,
        name: &str,
        details: CompanyDetails,
    ) -> Result<Company, DirectoryError> {
        let name = normalize_company(name);
        if name.is_empty() {
            return Err(DirectoryError::InvalidName);
        }

        let company = Company {
            name: name.clone(),
            details,
            created_at: Utc::now(),
        };
        let doc = encode(COMPANIES_DETAILS, &name, &company)?;

        // 已存在的公司不覆盖，created_at 保持首次写入的值；存在性检查在提交内完成
        let committed = self
            .client
            .commit(vec![
                Write::create(COMPANIES_DETAILS, &name, doc),
                Write::array_union(
                    COMPANIES,
                    COMPANY_LIST_KEY,
                    COMPANY_LIST_FIELD,
                    vec![Value::String(name.clone())],
                ),
            ])
            .await;
        match committed {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => return Err(DirectoryError::AlreadyExists(name)),
            Err(e) => return Err(e.into()),
        }

        log::info!("company {} added by {}", name, grant.uid());
        Ok(company)
    }

    /// 逐个删除详情记录，单个失败不影响其余；聚合文档与题目引用不动
    pub async fn delete_companies(&self, grant: &AdminGrant, names: &[String]) -> DeleteReport {
        let mut report = DeleteReport::default();

        for raw in names {
            let name = normalize_company(raw);
            if name.is_empty() {
                continue;
            }
            match self.delete_one(&name).await {
                Ok(true) => report.deleted.push(name),
                Ok(false) => report.not_found.push(name),
                Err(e) => {
                    log::warn!("failed to delete company {}: {}", name, e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        log::info!(
            "company delete by {}: {} deleted, {} not found, {} failed",
            grant.uid(),
            report.deleted.len(),
            report.not_found.len(),
            report.failed.len()
        );
        report
    }

    /// 返回详情记录删除前是否存在
    async fn delete_one(&self, name: &str) -> Result<bool, StoreError> {
        if self.client.get(COMPANIES_DETAILS, name).await?.is_none() {
            return Ok(false);
        }
        self.client.delete(COMPANIES_DETAILS, name).await?;
        Ok(true)
    }

    /// 全部公司，按名称排序
    pub async fn list_companies(&self) -> Result<Vec<Company>, StoreError> {
        let mut companies: Vec<Company> =
            self.client.query_as(COMPANIES_DETAILS, Filter::All).await?;
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    pub async fn get_company(&self, name: &str) -> Result<Option<Company>, StoreError> {
        self.client
            .get_as(COMPANIES_DETAILS, &normalize_company(name))
            .await
    }

    /// 聚合文档中的公司名，文档不存在时为空
    pub async fn list_aggregate_names(&self) -> Result<Vec<String>, StoreError> {
        let doc = self.client.get(COMPANIES, COMPANY_LIST_KEY).await?;
        let names = doc
            .as_ref()
            .and_then(|d| d.get(COMPANY_LIST_FIELD))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    pub async fn company_problems(&self, name: &str) -> Result<Vec<ProblemRecord>, StoreError> {
        self.problems.problems_for_company(name).await
    }

    /// 检查三处数据是否一致
    pub async fn reconcile(&self) -> Result<DriftReport, StoreError> {
        let listed: BTreeSet<String> = self.list_aggregate_names().await?.into_iter().collect();
        let detailed: BTreeSet<String> = self
            .client
            .query(COMPANIES_DETAILS, Filter::All)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        let problems: Vec<ProblemRecord> = self.client.query_as(PROBLEMS, Filter::All).await?;

        let mut dangling_references = Vec::new();
        for problem in &problems {
            for company in &problem.companies {
                if !detailed.contains(company) {
                    dangling_references.push(DanglingReference {
                        problem_id: problem.id.clone(),
                        company: company.clone(),
                    });
                }
            }
        }

        let report = DriftReport {
            listed_without_details: listed.difference(&detailed).cloned().collect(),
            details_not_listed: detailed.difference(&listed).cloned().collect(),
            dangling_references,
        };
        if !report.is_consistent() {
            log::warn!("company data drift detected: {:?}", report);
        }
        Ok(report)
    }

    /// 按详情记录重写聚合文档
    pub async fn repair_list_aggregate(&self, grant: &AdminGrant) -> Result<Vec<String>, StoreError> {
        let names: Vec<String> = self
            .client
            .query(COMPANIES_DETAILS, Filter::All)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        self.client
            .set(COMPANIES, COMPANY_LIST_KEY, json!({ COMPANY_LIST_FIELD: names }))
            .await?;

        log::info!(
            "company list rebuilt by {} with {} names",
            grant.uid(),
            names.len()
        );
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewProblem;
    use crate::services::database::{DocumentStore, MemoryStore};
    use crate::services::store_client::RetryPolicy;
    use std::sync::Arc;

    fn directory() -> (Arc<MemoryStore>, CompanyDirectory) {
        let store = Arc::new(MemoryStore::new());
        let client = StoreClient::new(store.clone(), RetryPolicy::no_retry());
        (store, CompanyDirectory::new(client))
    }

    fn problem(id: &str, order: u32, company: &str) -> NewProblem {
        NewProblem {
            id: id.to_string(),
            title: id.to_string(),
            difficulty: "Medium".to_string(),
            category: "Array".to_string(),
            order: order.to_string(),
            company: Some(company.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_normalizes_and_rejects_case_variant() {
        let (_, directory) = directory();
        let grant = AdminGrant::for_tests();

        let first = directory
            .add_company(&grant, "acme", CompanyDetails::default())
            .await
            .unwrap();
        assert_eq!(first.name, "ACME");

        let second = directory
            .add_company(&grant, "ACME", CompanyDetails::default())
            .await;
        assert!(matches!(second, Err(DirectoryError::AlreadyExists(name)) if name == "ACME"));

        let companies = directory.list_companies().await.unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "ACME");
        assert_eq!(companies[0].created_at, first.created_at);
        assert_eq!(directory.list_aggregate_names().await.unwrap(), vec!["ACME"]);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let (_, directory) = directory();
        let result = directory
            .add_company(&AdminGrant::for_tests(), "   ", CompanyDetails::default())
            .await;
        assert!(matches!(result, Err(DirectoryError::InvalidName)));
    }

    #[tokio::test]
    async fn test_add_is_atomic() {
        let (store, directory) = directory();
        // 聚合字段不是数组，array union 会失败
        store
            .set(COMPANIES, COMPANY_LIST_KEY, json!({ COMPANY_LIST_FIELD: "broken" }))
            .unwrap();

        let result = directory
            .add_company(&AdminGrant::for_tests(), "Globex", CompanyDetails::default())
            .await;
        assert!(matches!(result, Err(DirectoryError::Store(StoreError::InvalidWrite { .. }))));
        assert!(directory.get_company("globex").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_best_effort() {
        let (store, directory) = directory();
        let grant = AdminGrant::for_tests();
        for name in ["a", "b"] {
            directory
                .add_company(&grant, name, CompanyDetails::default())
                .await
                .unwrap();
        }

        store.fail_next(1);
        let report = directory
            .delete_companies(&grant, &["a".to_string(), "b".to_string()])
            .await;

        assert_eq!(report.deleted, vec!["B"]);
        assert!(report.not_found.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "A");

        let remaining: Vec<String> = directory
            .list_companies()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(remaining, vec!["A"]);
    }

    #[tokio::test]
    async fn test_delete_reports_unknown_names_separately() {
        let (_, directory) = directory();
        let grant = AdminGrant::for_tests();
        directory
            .add_company(&grant, "hooli", CompanyDetails::default())
            .await
            .unwrap();

        let report = directory
            .delete_companies(&grant, &["Hooli".to_string(), "pied piper".to_string()])
            .await;

        assert_eq!(report.deleted, vec!["HOOLI"]);
        assert_eq!(report.not_found, vec!["PIED PIPER"]);
        assert!(report.failed.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["notFound"], json!(["PIED PIPER"]));

        // 再删一次，已不存在
        let again = directory.delete_companies(&grant, &["hooli".to_string()]).await;
        assert!(again.deleted.is_empty());
        assert_eq!(again.not_found, vec!["HOOLI"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_create_company_once() {
        for round in 0..20 {
            let (_, directory) = directory();
            let grant = AdminGrant::for_tests();
            let details = CompanyDetails::default();

            let name = format!("race-{}", round);
            let upper_name = name.to_uppercase();
            let (a, b) = tokio::join!(
                directory.add_company(&grant, &name, details.clone()),
                directory.add_company(&grant, &upper_name, details.clone()),
            );

            let created: Vec<Company> = [a, b]
                .into_iter()
                .filter_map(|result| match result {
                    Ok(company) => Some(company),
                    Err(DirectoryError::AlreadyExists(_)) => None,
                    Err(e) => panic!("unexpected error: {}", e),
                })
                .collect();
            assert_eq!(created.len(), 1, "round {}", round);

            let stored = directory.get_company(&name).await.unwrap().unwrap();
            assert_eq!(stored.created_at, created[0].created_at);
            assert_eq!(
                directory.list_aggregate_names().await.unwrap(),
                vec![name.to_uppercase()]
            );
        }
    }

    #[tokio::test]
    async fn test_delete_leaves_dangling_references() {
        let (store, directory) = directory();
        let grant = AdminGrant::for_tests();
        let problems = ProblemStore::new(StoreClient::new(store.clone(), RetryPolicy::no_retry()));

        directory
            .add_company(&grant, "acme", CompanyDetails::default())
            .await
            .unwrap();
        problems.add_problem(&grant, problem("rotate-array", 1, "acme")).await.unwrap();

        directory.delete_companies(&grant, &["Acme".to_string()]).await;

        assert!(directory.list_companies().await.unwrap().is_empty());
        // 题目仍然引用 ACME，聚合文档也仍然列出它
        let linked = directory.company_problems("acme").await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].companies, vec!["ACME"]);
        assert_eq!(directory.list_aggregate_names().await.unwrap(), vec!["ACME"]);

        let drift = directory.reconcile().await.unwrap();
        assert_eq!(drift.listed_without_details, vec!["ACME"]);
        assert!(drift.details_not_listed.is_empty());
        assert_eq!(
            drift.dangling_references,
            vec![DanglingReference {
                problem_id: "rotate-array".to_string(),
                company: "ACME".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_repair_rebuilds_aggregate() {
        let (store, directory) = directory();
        let grant = AdminGrant::for_tests();
        directory
            .add_company(&grant, "initech", CompanyDetails::default())
            .await
            .unwrap();
        // 模拟旧数据：详情存在但聚合缺失
        store.delete(COMPANIES, COMPANY_LIST_KEY).unwrap();
        store
            .array_union(COMPANIES, COMPANY_LIST_KEY, COMPANY_LIST_FIELD, vec![json!("GHOST")])
            .unwrap();

        let drift = directory.reconcile().await.unwrap();
        assert_eq!(drift.details_not_listed, vec!["INITECH"]);
        assert_eq!(drift.listed_without_details, vec!["GHOST"]);

        let names = directory.repair_list_aggregate(&grant).await.unwrap();
        assert_eq!(names, vec!["INITECH"]);
        assert!(directory.reconcile().await.unwrap().is_consistent());
    }
}
