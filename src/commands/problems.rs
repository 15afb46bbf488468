//! 题目相关命令：内置题库、题目记录、公司题目与提交判题

use crate::commands::state::AppState;
use crate::models::{Company, Difficulty, ProblemRecord};
use crate::services::auth::Identity;
use crate::services::catalog::{render_statement, Example, Problem};
use crate::services::submission::SubmissionOutcome;
use serde::Serialize;

/// 题目列表项
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntryDto {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub order: u32,
    pub companies: Vec<String>,
}

impl From<&Problem> for CatalogEntryDto {
    fn from(p: &Problem) -> Self {
        Self {
            id: p.id.to_string(),
            title: p.title.to_string(),
            difficulty: p.difficulty,
            category: p.category.to_string(),
            order: p.order,
            companies: p.companies.clone(),
        }
    }
}

/// 题目详情，测试向量不下发
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProblemDto {
    #[serde(flatten)]
    pub entry: CatalogEntryDto,
    pub statement_html: String,
    pub constraints_html: String,
    pub examples: Vec<Example>,
    pub starter_code: String,
    pub case_count: usize,
}

impl From<&Problem> for CatalogProblemDto {
    fn from(p: &Problem) -> Self {
        let rendered = render_statement(p);
        Self {
            entry: p.into(),
            statement_html: rendered.statement_html,
            constraints_html: rendered.constraints_html,
            examples: p.examples.clone(),
            starter_code: p.starter_code.to_string(),
            case_count: p.handler.vectors().len(),
        }
    }
}

pub fn list_catalog(state: &AppState) -> Result<Vec<CatalogEntryDto>, String> {
    Ok(state.catalog.all().into_iter().map(Into::into).collect())
}

pub fn get_catalog_problem(state: &AppState, id: &str) -> Result<Option<CatalogProblemDto>, String> {
    Ok(state.catalog.lookup(id).map(Into::into))
}

pub fn next_problem(state: &AppState, id: &str) -> Result<Option<CatalogEntryDto>, String> {
    Ok(state.catalog.next(id).map(Into::into))
}

pub fn previous_problem(state: &AppState, id: &str) -> Result<Option<CatalogEntryDto>, String> {
    Ok(state.catalog.previous(id).map(Into::into))
}

pub async fn list_problems(state: &AppState) -> Result<Vec<ProblemRecord>, String> {
    state.problems.list_problems().await.map_err(|e| {
        log::warn!("list problems failed: {}", e);
        e.to_string()
    })
}

pub async fn get_problem(state: &AppState, id: &str) -> Result<Option<ProblemRecord>, String> {
    state.problems.get_problem(id).await.map_err(|e| e.to_string())
}

pub async fn list_companies(state: &AppState) -> Result<Vec<Company>, String> {
    state.companies.list_companies().await.map_err(|e| {
        log::warn!("list companies failed: {}", e);
        e.to_string()
    })
}

pub async fn get_company(state: &AppState, name: &str) -> Result<Option<Company>, String> {
    state.companies.get_company(name).await.map_err(|e| e.to_string())
}

pub async fn company_problems(state: &AppState, name: &str) -> Result<Vec<ProblemRecord>, String> {
    state
        .companies
        .company_problems(name)
        .await
        .map_err(|e| e.to_string())
}

/// 提交代码判题；未登录时只返回结果，不记录进度
pub async fn submit_solution(
    state: &AppState,
    identity: Option<&Identity>,
    problem_id: &str,
    source: &str,
) -> Result<SubmissionOutcome, String> {
    state
        .submissions
        .submit(identity, problem_id, source, &state.cancel)
        .await
        .map_err(|e| e.to_string())
}
