//! 管理员命令
//! 每个命令先换取 AdminGrant；写操作经过表单状态机，提交中的表单拒绝重复提交

use crate::commands::state::{AdminForm, AppState};
use crate::models::{Company, CompanyDetails, NewProblem, ProblemRecord};
use crate::services::admin_flow::FlowState;
use crate::services::auth::{authorize_admin, AdminGrant, Identity};
use crate::services::companies::{DeleteReport, DriftReport};
use std::future::Future;

fn admin(identity: Option<&Identity>) -> Result<AdminGrant, String> {
    authorize_admin(identity).map_err(|e| e.to_string())
}

pub fn open_admin_form(
    state: &AppState,
    identity: Option<&Identity>,
    form: AdminForm,
) -> Result<FlowState, String> {
    let grant = admin(identity)?;
    state.with_flow(grant.uid(), form, |flow| flow.edit().map_err(|e| e.to_string()))
}

pub fn close_admin_form(
    state: &AppState,
    identity: Option<&Identity>,
    form: AdminForm,
) -> Result<FlowState, String> {
    let grant = admin(identity)?;
    state.with_flow(grant.uid(), form, |flow| flow.close().map_err(|e| e.to_string()))
}

pub fn admin_form_state(
    state: &AppState,
    identity: Option<&Identity>,
    form: AdminForm,
) -> Result<FlowState, String> {
    let grant = admin(identity)?;
    state.with_flow(grant.uid(), form, |_| Ok(()))
}

/// 以表单状态机包裹一次写操作：Editing → Submitting → Done | Failed
async fn submit_form<T, E, Fut>(
    state: &AppState,
    grant: &AdminGrant,
    form: AdminForm,
    op: Fut,
) -> Result<T, String>
where
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    state.with_flow(grant.uid(), form, |flow| {
        flow.edit().map_err(|e| e.to_string())?;
        flow.submit().map_err(|e| e.to_string())
    })?;

    let result = op.await.map_err(|e| e.to_string());

    state.with_flow(grant.uid(), form, |flow| {
        let moved = match &result {
            Ok(_) => flow.succeed(),
            Err(reason) => flow.fail(reason.clone()),
        };
        moved.map_err(|e| e.to_string())
    })?;

    result
}

pub async fn add_problem(
    state: &AppState,
    identity: Option<&Identity>,
    problem: NewProblem,
) -> Result<ProblemRecord, String> {
    let grant = admin(identity)?;
    let op = state.problems.add_problem(&grant, problem);
    submit_form(state, &grant, AdminForm::AddProblem, op).await
}

pub async fn add_company(
    state: &AppState,
    identity: Option<&Identity>,
    name: &str,
    details: CompanyDetails,
) -> Result<Company, String> {
    let grant = admin(identity)?;
    let op = state.companies.add_company(&grant, name, details);
    submit_form(state, &grant, AdminForm::AddCompany, op).await
}

pub async fn delete_companies(
    state: &AppState,
    identity: Option<&Identity>,
    names: &[String],
) -> Result<DeleteReport, String> {
    let grant = admin(identity)?;
    Ok(state.companies.delete_companies(&grant, names).await)
}

pub async fn reconcile_companies(
    state: &AppState,
    identity: Option<&Identity>,
) -> Result<DriftReport, String> {
    admin(identity)?;
    state.companies.reconcile().await.map_err(|e| e.to_string())
}

pub async fn repair_company_list(
    state: &AppState,
    identity: Option<&Identity>,
) -> Result<Vec<String>, String> {
    let grant = admin(identity)?;
    state
        .companies
        .repair_list_aggregate(&grant)
        .await
        .map_err(|e| e.to_string())
}
