//! 请求分发
//! 每行一个 JSON 请求，按 `command` 字段路由到对应命令函数

use crate::commands::state::{AdminForm, AppState, Session};
use crate::commands::{admin, problems, progress};
use crate::models::{CompanyDetails, NewProblem};
use crate::services::progress::Reaction;
use crate::utils;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Version,
    Whoami,

    // 内置题库
    ListCatalog,
    GetCatalogProblem { id: String },
    NextProblem { id: String },
    PreviousProblem { id: String },
    Submit { problem_id: String, source: String },

    // 题目记录与公司
    ListProblems,
    GetProblem { id: String },
    ListCompanies,
    GetCompany { name: String },
    CompanyProblems { name: String },

    // 用户进度
    GetProgress,
    SetReaction { problem_id: String, reaction: Reaction },
    ToggleStar { problem_id: String },
    Dashboard,

    // 管理员
    OpenAdminForm { form: AdminForm },
    CloseAdminForm { form: AdminForm },
    AdminFormState { form: AdminForm },
    AddProblem { problem: NewProblem },
    AddCompany {
        name: String,
        #[serde(default)]
        details: CompanyDetails,
    },
    DeleteCompanies { names: Vec<String> },
    ReconcileCompanies,
    RepairCompanyList,
}

/// 一次请求：可选的关联 id、登录信息与命令
///
/// 命令参数与 `command` 平铺在同一层，例如
/// `{"request_id": 7, "command": "next_problem", "id": "factorial"}`
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub request_id: Option<Value>,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(request_id: Option<Value>, data: Value) -> Self {
        Self {
            request_id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(request_id: Option<Value>, error: impl Into<String>) -> Self {
        Self {
            request_id,
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionInfo {
    version: &'static str,
    platform: &'static str,
}

fn to_data<T: Serialize>(result: Result<T, String>) -> Result<Value, String> {
    result.and_then(|value| serde_json::to_value(value).map_err(|e| e.to_string()))
}

pub async fn dispatch(state: &AppState, request: Request) -> Response {
    let identity = state.identity(request.session.as_ref());
    let who = identity.as_ref();

    let result = match request.command {
        Command::Version => to_data(Ok(VersionInfo {
            version: env!("CARGO_PKG_VERSION"),
            platform: utils::get_platform(),
        })),
        Command::Whoami => to_data(Ok(identity.clone())),

        Command::ListCatalog => to_data(problems::list_catalog(state)),
        Command::GetCatalogProblem { id } => to_data(problems::get_catalog_problem(state, &id)),
        Command::NextProblem { id } => to_data(problems::next_problem(state, &id)),
        Command::PreviousProblem { id } => to_data(problems::previous_problem(state, &id)),
        Command::Submit { problem_id, source } => {
            to_data(problems::submit_solution(state, who, &problem_id, &source).await)
        }

        Command::ListProblems => to_data(problems::list_problems(state).await),
        Command::GetProblem { id } => to_data(problems::get_problem(state, &id).await),
        Command::ListCompanies => to_data(problems::list_companies(state).await),
        Command::GetCompany { name } => to_data(problems::get_company(state, &name).await),
        Command::CompanyProblems { name } => {
            to_data(problems::company_problems(state, &name).await)
        }

        Command::GetProgress => to_data(progress::get_progress(state, who).await),
        Command::SetReaction {
            problem_id,
            reaction,
        } => to_data(progress::set_reaction(state, who, &problem_id, reaction).await),
        Command::ToggleStar { problem_id } => {
            to_data(progress::toggle_star(state, who, &problem_id).await)
        }
        Command::Dashboard => to_data(progress::get_dashboard(state, who).await),

        Command::OpenAdminForm { form } => to_data(admin::open_admin_form(state, who, form)),
        Command::CloseAdminForm { form } => to_data(admin::close_admin_form(state, who, form)),
        Command::AdminFormState { form } => to_data(admin::admin_form_state(state, who, form)),
        Command::AddProblem { problem } => to_data(admin::add_problem(state, who, problem).await),
        Command::AddCompany { name, details } => {
            to_data(admin::add_company(state, who, &name, details).await)
        }
        Command::DeleteCompanies { names } => {
            to_data(admin::delete_companies(state, who, &names).await)
        }
        Command::ReconcileCompanies => to_data(admin::reconcile_companies(state, who).await),
        Command::RepairCompanyList => to_data(admin::repair_company_list(state, who).await),
    };

    match result {
        Ok(data) => Response::success(request.request_id, data),
        Err(error) => Response::failure(request.request_id, error),
    }
}

/// 解析并处理一行输入
pub async fn handle_line(state: &AppState, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(state, request).await,
        Err(e) => {
            log::warn!("rejected malformed request: {}", e);
            Response::failure(None, format!("invalid request: {}", e))
        }
    }
}

/// 逐行读取请求并写回响应，直到输入结束或收到取消
pub async fn serve<R, W>(state: &AppState, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        // 等待输入时也要响应取消
        let line = tokio::select! {
            biased;
            _ = state.cancel.cancelled() => {
                log::info!("cancellation requested, no longer reading requests");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(state, &line).await;
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::services::database::MemoryStore;
    use crate::services::runner::CancelToken;
    use crate::services::store_client::RetryPolicy;
    use serde_json::json;
    use std::sync::Arc;

    const ADMIN: &str = r#"{"uid": "root", "email": "admin@example.com"}"#;
    const USER: &str = r#"{"uid": "u1", "email": "someone@example.com"}"#;

    fn state() -> (Arc<MemoryStore>, AppState) {
        state_with_cancel(CancelToken::never())
    }

    fn state_with_cancel(cancel: CancelToken) -> (Arc<MemoryStore>, AppState) {
        let store = Arc::new(MemoryStore::new());
        let config = AppConfig {
            admin_emails: vec!["admin@example.com".to_string()],
            retry: RetryPolicy::no_retry(),
            ..AppConfig::default()
        };
        let state = AppState::with_store(store.clone(), &config, cancel).unwrap();
        (store, state)
    }

    async fn call(state: &AppState, line: &str) -> Response {
        handle_line(state, line).await
    }

    #[tokio::test]
    async fn test_catalog_navigation() {
        let (_, state) = state();

        let response = call(&state, r#"{"request_id": 1, "command": "list_catalog"}"#).await;
        assert!(response.ok);
        assert_eq!(response.request_id, Some(json!(1)));
        let ids: Vec<&str> = response.data.as_ref().unwrap().as_array().unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids[0], "palindrome-number");
        assert_eq!(ids.len(), 5);

        let next = call(&state, r#"{"command": "next_problem", "id": "jump-game"}"#).await;
        assert_eq!(next.data.unwrap()["id"], "palindrome-number");

        let detail = call(&state, r#"{"command": "get_catalog_problem", "id": "factorial"}"#).await;
        let detail = detail.data.unwrap();
        assert_eq!(detail["caseCount"], 5);
        assert!(detail.get("handler").is_none());
        assert!(detail["statementHtml"].as_str().unwrap().contains("<p>"));
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let (_, state) = state();
        let response = call(&state, r#"{"command": "launch_rockets"}"#).await;
        assert!(!response.ok);
        assert!(response.error.unwrap().starts_with("invalid request"));
    }

    #[tokio::test]
    async fn test_admin_commands_require_role() {
        let (_, state) = state();

        let anonymous = call(&state, r#"{"command": "add_company", "name": "acme"}"#).await;
        assert_eq!(anonymous.error.as_deref(), Some("sign in required"));

        let user = call(
            &state,
            &format!(r#"{{"session": {}, "command": "add_company", "name": "acme"}}"#, USER),
        )
        .await;
        assert_eq!(user.error.as_deref(), Some("user u1 is not an admin"));

        let admin = call(
            &state,
            &format!(
                r#"{{"session": {}, "command": "add_company", "name": "acme", "details": {{"founded": 1949}}}}"#,
                ADMIN
            ),
        )
        .await;
        assert!(admin.ok, "{:?}", admin.error);
        assert_eq!(admin.data.as_ref().unwrap()["name"], "ACME");
        assert_eq!(admin.data.as_ref().unwrap()["founded"], 1949);

        let state_line = format!(
            r#"{{"session": {}, "command": "admin_form_state", "form": "add_company"}}"#,
            ADMIN
        );
        let flow = call(&state, &state_line).await;
        assert_eq!(flow.data.unwrap()["state"], "done");
    }

    #[tokio::test]
    async fn test_failed_submit_moves_form_to_failed() {
        let (_, state) = state();
        let add = format!(
            r#"{{"session": {}, "command": "add_problem", "problem": {{"id": "Bad Id", "title": "x", "difficulty": "Easy", "category": "Array", "order": "1"}}}}"#,
            ADMIN
        );
        let response = call(&state, &add).await;
        assert!(!response.ok);

        let state_line = format!(
            r#"{{"session": {}, "command": "admin_form_state", "form": "add_problem"}}"#,
            ADMIN
        );
        let flow = call(&state, &state_line).await.data.unwrap();
        assert_eq!(flow["state"], "failed");
        assert!(flow["reason"].as_str().unwrap().contains("Bad Id"));
    }

    #[tokio::test]
    async fn test_dashboard_falls_back_to_last_snapshot() {
        let (store, state) = state();
        let add = format!(
            r#"{{"session": {}, "command": "add_problem", "problem": {{"id": "two-sum", "title": "Two Sum", "difficulty": "Easy", "category": "Array", "order": "1"}}}}"#,
            ADMIN
        );
        assert!(call(&state, &add).await.ok);

        let star = format!(r#"{{"session": {}, "command": "toggle_star", "problem_id": "two-sum"}}"#, USER);
        assert_eq!(call(&state, &star).await.data, Some(json!(true)));

        let dashboard = format!(r#"{{"session": {}, "command": "dashboard"}}"#, USER);
        let fresh = call(&state, &dashboard).await.data.unwrap();
        assert_eq!(fresh["starred"][0]["id"], "two-sum");

        store.fail_next(1);
        let fallback = call(&state, &dashboard).await;
        assert!(fallback.ok);
        assert_eq!(fallback.data.unwrap(), fresh);

        // 其他用户没有快照，得到空仪表盘
        store.fail_next(1);
        let other = call(&state, r#"{"session": {"uid": "u2"}, "command": "dashboard"}"#).await;
        assert_eq!(other.data.unwrap()["starred"], json!([]));
    }

    #[tokio::test]
    async fn test_whoami_resolves_roles() {
        let (_, state) = state();
        let me = call(&state, &format!(r#"{{"session": {}, "command": "whoami"}}"#, ADMIN)).await;
        assert_eq!(me.data.unwrap()["roles"], json!(["admin"]));

        let nobody = call(&state, r#"{"command": "whoami"}"#).await;
        assert_eq!(nobody.data, Some(Value::Null));
    }

    #[tokio::test]
    async fn test_serve_answers_each_line() {
        let (_, state) = state();
        let input = concat!(
            r#"{"request_id": 1, "command": "version"}"#,
            "\n\n",
            "not json\n",
        );
        let mut output = Vec::new();

        serve(&state, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["request_id"], json!(1));
        assert_eq!(responses[0]["ok"], json!(true));
        assert_eq!(responses[1]["ok"], json!(false));
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel_while_waiting_for_input() {
        let (handle, cancel) = CancelToken::new();
        let (_, state) = state_with_cancel(cancel);
        // 对端保持打开但从不写入，next_line 会一直挂起
        let (_client, server) = tokio::io::duplex(64);

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            handle.cancel();
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            serve(&state, tokio::io::BufReader::new(server), tokio::io::sink()),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}
