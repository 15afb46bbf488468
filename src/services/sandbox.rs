//! 沙箱执行
//! 每次调用在独立子进程中运行用户代码：清空环境变量、独立工作目录、限时、限制输出大小。
//! 默认命令启用 Node 权限模型，用户代码只能读取自己的脚本，不能派生进程、写文件或启动 worker。
//! unix 上子进程独占一个进程组，结束时整组清理。
//! 请求/响应约定：stdin 输入 JSON 参数数组，stdout 最后一行输出 `{"ok": 值}` 或 `{"error": 消息}`。

use crate::services::runner::{Candidate, CandidateError};
use futures::future::BoxFuture;
use serde_json::Value;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::OnceCell;
use uuid::Uuid;

/// 命令行参数中的脚本路径占位符
pub const SCRIPT_PLACEHOLDER: &str = "{script}";
/// 命令行参数中的 Node 权限模型开关占位符，按解释器版本展开
pub const PERMISSION_PLACEHOLDER: &str = "{permission}";

/// 沙箱配置
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxConfig {
    /// 解释器命令，`{script}` 会被替换为生成的脚本路径
    pub command: Vec<String>,
    pub timeout: Duration,
    /// stdout / stderr 各自的最大字节数
    pub max_output_bytes: usize,
    /// 脚本与子进程工作目录
    pub scratch_dir: PathBuf,
    /// 子进程保留的环境变量
    pub keep_env: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "node".to_string(),
                PERMISSION_PLACEHOLDER.to_string(),
                format!("--allow-fs-read={}", SCRIPT_PLACEHOLDER),
                "--max-old-space-size=128".to_string(),
                SCRIPT_PLACEHOLDER.to_string(),
            ],
            timeout: Duration::from_secs(2),
            max_output_bytes: 64 * 1024,
            scratch_dir: std::env::temp_dir().join("practice-hub-sandbox"),
            keep_env: vec!["PATH".to_string()],
        }
    }
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox command is empty")]
    EmptyCommand,
    #[error("failed to prepare sandbox: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode arguments: {0}")]
    Encode(#[from] serde_json::Error),
    /// 子进程正常退出但没有按约定输出
    #[error("malformed sandbox reply: {0}")]
    Protocol(String),
}

/// 单次执行请求
#[derive(Debug, Clone)]
pub struct SandboxRequest {
    pub source: String,
    pub entry_point: String,
    pub args: Vec<Value>,
}

/// 单次执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum SandboxResponse {
    Output(Value),
    /// 用户代码抛出的错误
    Error(String),
    TimedOut(Duration),
}

/// Node 权限模型开关：22.13 / 23.5 起为 `--permission`，更早的版本为 `--experimental-permission`
pub fn permission_flag_for(version: &str) -> &'static str {
    let mut parts = version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .map(|part| part.parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);

    let stable = match major {
        0..=21 => false,
        22 => minor >= 13,
        23 => minor >= 5,
        _ => true,
    };
    if stable {
        "--permission"
    } else {
        "--experimental-permission"
    }
}

async fn detect_permission_flag(program: &str) -> String {
    let output = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    let version = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(output) => {
            log::warn!("{} --version exited with {}", program, output.status);
            String::new()
        }
        Err(e) => {
            log::warn!("failed to query {} version: {}", program, e);
            String::new()
        }
    };

    let flag = permission_flag_for(&version);
    log::info!("sandbox interpreter {} {}, using {}", program, version, flag);
    flag.to_string()
}

/// 生成包裹用户代码的 JavaScript 脚本；参数经 `process.stdin` 读取，不依赖文件系统权限
pub fn render_harness(source: &str, entry_point: &str) -> String {
    let mut script = String::from(
        "\"use strict\";\n\
         console.log = (...parts) => process.stderr.write(parts.map(String).join(\" \") + \"\\n\");\n",
    );
    script.push_str(source);
    script.push_str("\n;(function () {\n");
    script.push_str("  let input = \"\";\n");
    script.push_str("  process.stdin.setEncoding(\"utf8\");\n");
    script.push_str("  process.stdin.on(\"data\", (chunk) => { input += chunk; });\n");
    script.push_str("  process.stdin.on(\"end\", () => {\n");
    script.push_str("    let reply;\n");
    script.push_str("    try {\n");
    script.push_str("      const args = JSON.parse(input);\n");
    script.push_str(&format!("      const result = {}(...args);\n", entry_point));
    script.push_str("      reply = { ok: result === undefined ? null : result };\n");
    script.push_str("    } catch (e) {\n");
    script.push_str("      reply = { error: String(e && e.message ? e.message : e) };\n");
    script.push_str("    }\n");
    script.push_str("    process.stdout.write(JSON.stringify(reply) + \"\\n\");\n");
    script.push_str("  });\n");
    script.push_str("})();\n");
    script
}

/// 生成的脚本文件，离开作用域时删除（包括调用方超时丢弃 future 的情况）
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            log::debug!("failed to remove sandbox script {}: {}", self.0.display(), e);
        }
    }
}

/// 子进程所在的进程组，drop 时整组 SIGKILL，清理用户代码留下的后代进程
struct ProcessGroup(Option<i32>);

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        // pid 0 / 1 作为进程组号会波及无关进程
        Self(child.id().map(|pid| pid as i32).filter(|pid| *pid > 1))
    }

    #[cfg(unix)]
    fn kill(&self) {
        if let Some(pgid) = self.0 {
            // 组内已无进程时返回 ESRCH
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// 子进程沙箱
#[derive(Debug, Clone)]
pub struct Sandbox {
    config: SandboxConfig,
    /// `{permission}` 展开结果，首次使用时探测解释器版本
    permission_flag: Arc<OnceCell<String>>,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            permission_flag: Arc::new(OnceCell::new()),
        }
    }

    /// 默认 node 配置，独立的临时目录；未安装 node 时返回 None
    #[cfg(test)]
    pub(crate) fn node_for_tests() -> Option<Self> {
        let installed = std::process::Command::new("node")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);
        if !installed {
            eprintln!("node is not installed, skipping");
            return None;
        }
        Some(Self::new(SandboxConfig {
            scratch_dir: std::env::temp_dir().join(format!("practice-hub-node-{}", Uuid::new_v4())),
            ..SandboxConfig::default()
        }))
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// 执行一次请求
    pub async fn run(&self, request: &SandboxRequest) -> Result<SandboxResponse, SandboxError> {
        let (program, rest) = self
            .config
            .command
            .split_first()
            .ok_or(SandboxError::EmptyCommand)?;

        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;
        // 权限模型按解析后的真实路径比对
        let scratch_dir = tokio::fs::canonicalize(&self.config.scratch_dir).await?;
        let script = ScratchFile(scratch_dir.join(format!("run-{}.cjs", Uuid::new_v4())));
        tokio::fs::write(
            &script.0,
            render_harness(&request.source, &request.entry_point),
        )
        .await?;

        let permission = if rest.iter().any(|arg| arg.contains(PERMISSION_PLACEHOLDER)) {
            self.permission_flag
                .get_or_init(|| detect_permission_flag(program))
                .await
                .as_str()
        } else {
            ""
        };

        let script_arg = script.0.to_string_lossy().to_string();
        let mut command = Command::new(program);
        command
            .args(rest.iter().map(|arg| {
                arg.replace(PERMISSION_PLACEHOLDER, permission)
                    .replace(SCRIPT_PLACEHOLDER, &script_arg)
            }))
            .current_dir(&scratch_dir)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        for key in &self.config.keep_env {
            if let Ok(value) = std::env::var(key) {
                command.env(key, value);
            }
        }

        let mut payload = serde_json::to_vec(&request.args)?;
        payload.push(b'\n');

        self.execute(command, payload).await
    }

    async fn execute(
        &self,
        mut command: Command,
        payload: Vec<u8>,
    ) -> Result<SandboxResponse, SandboxError> {
        let mut child = command.spawn()?;
        let group = ProcessGroup::of(&child);
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.config.max_output_bytes;

        let io = async {
            if let Some(mut stdin) = stdin {
                // 子进程可能根本不读 stdin
                match stdin.write_all(&payload).await {
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            let (out, err) = tokio::join!(read_limited(stdout, limit), read_limited(stderr, limit));
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out?, err?))
        };

        let (status, stdout, stderr) = match tokio::time::timeout(self.config.timeout, io).await {
            Ok(result) => result?,
            Err(_) => {
                group.kill();
                if let Err(e) = child.start_kill() {
                    log::debug!("sandbox process already gone: {}", e);
                }
                let _ = child.wait().await;
                log::info!("sandbox run timed out after {:?}", self.config.timeout);
                return Ok(SandboxResponse::TimedOut(self.config.timeout));
            }
        };

        interpret_reply(status, stdout, stderr, limit)
    }
}

/// 读取至多 `limit + 1` 字节，多出的一字节用于判断是否超限
async fn read_limited<R>(reader: Option<R>, limit: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(reader) = reader {
        reader.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

fn interpret_reply(
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    limit: usize,
) -> Result<SandboxResponse, SandboxError> {
    if stdout.len() > limit {
        return Ok(SandboxResponse::Error(format!(
            "output exceeded {} bytes",
            limit
        )));
    }

    let stdout = String::from_utf8_lossy(&stdout);
    let reply = stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| serde_json::from_str::<Value>(line.trim()).ok());

    if let Some(Value::Object(mut reply)) = reply {
        if let Some(value) = reply.remove("ok") {
            return Ok(SandboxResponse::Output(value));
        }
        if let Some(message) = reply.remove("error") {
            let message = match message {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Ok(SandboxResponse::Error(message));
        }
    }

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        let detail = stderr.trim();
        return Ok(SandboxResponse::Error(if detail.is_empty() {
            format!("process exited with {}", status)
        } else {
            detail.to_string()
        }));
    }

    Err(SandboxError::Protocol(stdout.trim().to_string()))
}

/// 在沙箱中运行的用户提交
#[derive(Debug, Clone)]
pub struct SandboxCandidate {
    sandbox: Arc<Sandbox>,
    source: String,
    entry_point: String,
}

impl SandboxCandidate {
    pub fn new(sandbox: Arc<Sandbox>, source: &str, entry_point: &str) -> Self {
        Self {
            sandbox,
            source: source.to_string(),
            entry_point: entry_point.to_string(),
        }
    }
}

impl Candidate for SandboxCandidate {
    fn invoke<'a>(&'a self, args: &'a [Value]) -> BoxFuture<'a, Result<Value, CandidateError>> {
        Box::pin(async move {
            let request = SandboxRequest {
                source: self.source.clone(),
                entry_point: self.entry_point.clone(),
                args: args.to_vec(),
            };

            match self.sandbox.run(&request).await {
                Ok(SandboxResponse::Output(value)) => Ok(value),
                Ok(SandboxResponse::Error(message)) => Err(CandidateError::Raised(message)),
                Ok(SandboxResponse::TimedOut(after)) => Err(CandidateError::TimedOut(after)),
                Err(e) => {
                    log::error!("sandbox failure: {}", e);
                    Err(CandidateError::Sandbox(e.to_string()))
                }
            }
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::services::catalog::Catalog;
    use crate::services::runner::{CancelToken, FailureReason, ValidationRunner, Verdict};
    use serde_json::json;

    fn shell(script: &str) -> Sandbox {
        Sandbox::new(SandboxConfig {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            timeout: Duration::from_secs(5),
            scratch_dir: std::env::temp_dir().join(format!("practice-hub-test-{}", Uuid::new_v4())),
            ..SandboxConfig::default()
        })
    }

    fn request(args: Vec<Value>) -> SandboxRequest {
        SandboxRequest {
            source: "function factorial(n) { return 1; }".to_string(),
            entry_point: "factorial".to_string(),
            args,
        }
    }

    #[test]
    fn test_render_harness() {
        let script = render_harness("function factorial(n){ return n; };", "factorial");
        assert!(script.starts_with("\"use strict\";"));
        assert!(script.contains("function factorial(n){ return n; };"));
        assert!(script.contains("const result = factorial(...args);"));
        assert!(script.contains("JSON.stringify(reply)"));
        assert!(script.contains("process.stdin.on(\"end\""));
        assert!(!script.contains("readFileSync"));
    }

    #[test]
    fn test_permission_flag_follows_node_version() {
        assert_eq!(permission_flag_for("v20.11.1"), "--experimental-permission");
        assert_eq!(permission_flag_for("v22.12.0"), "--experimental-permission");
        assert_eq!(permission_flag_for("v22.13.0\n"), "--permission");
        assert_eq!(permission_flag_for("v23.5.0"), "--permission");
        assert_eq!(permission_flag_for("v24.1.0"), "--permission");
    }

    #[test]
    fn test_default_command_enables_permission_model() {
        let command = SandboxConfig::default().command;
        assert_eq!(command[0], "node");
        assert!(command.contains(&PERMISSION_PLACEHOLDER.to_string()));
        assert!(command.contains(&"--allow-fs-read={script}".to_string()));
        assert!(!command.iter().any(|arg| arg.starts_with("--allow-child-process")));
        assert_eq!(command.last().map(String::as_str), Some(SCRIPT_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_ok_reply() {
        let sandbox = shell(r#"cat >/dev/null; echo 'debug noise'; echo '{"ok":120}'"#);
        let response = sandbox.run(&request(vec![json!(5)])).await.unwrap();
        assert_eq!(response, SandboxResponse::Output(json!(120)));
    }

    #[tokio::test]
    async fn test_args_arrive_on_stdin() {
        let sandbox = shell(r#"read line; printf '{"ok":%s}\n' "$line""#);
        let response = sandbox
            .run(&request(vec![json!([2, 7]), json!(9)]))
            .await
            .unwrap();
        assert_eq!(response, SandboxResponse::Output(json!([[2, 7], 9])));
    }

    #[tokio::test]
    async fn test_script_placeholder_is_substituted() {
        let mut sandbox = shell(r#"grep -q 'factorial(...args)' "$0" && echo '{"ok":true}'"#);
        sandbox.config.command.push(SCRIPT_PLACEHOLDER.to_string());
        let response = sandbox.run(&request(vec![json!(1)])).await.unwrap();
        assert_eq!(response, SandboxResponse::Output(json!(true)));
    }

    #[tokio::test]
    async fn test_error_reply() {
        let sandbox = shell(r#"echo '{"error":"boom"}'"#);
        let response = sandbox.run(&request(vec![json!(1)])).await.unwrap();
        assert_eq!(response, SandboxResponse::Error("boom".to_string()));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let sandbox = shell("echo 'SyntaxError: oops' >&2; exit 3");
        let response = sandbox.run(&request(vec![json!(1)])).await.unwrap();
        assert_eq!(response, SandboxResponse::Error("SyntaxError: oops".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let mut sandbox = shell("sleep 5");
        sandbox.config.timeout = Duration::from_millis(100);
        let response = sandbox.run(&request(vec![json!(1)])).await.unwrap();
        assert_eq!(response, SandboxResponse::TimedOut(Duration::from_millis(100)));
    }

    /// 进程是否仍在运行（僵尸进程不算）
    fn running(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .map(|rest| !rest.trim_start().starts_with('Z'))
                .unwrap_or(true),
            Err(_) if std::path::Path::new("/proc/self").exists() => false,
            Err(_) => std::process::Command::new("kill")
                .args(["-0", pid])
                .status()
                .map(|status| status.success())
                .unwrap_or(false),
        }
    }

    async fn assert_reaped(pid_file: PathBuf) {
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let pid = pid.trim();
        for _ in 0..40 {
            if !running(pid) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("background process {} survived the sandbox run", pid);
    }

    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let mut sandbox = shell("sleep 30 & echo $! > background.pid; wait");
        sandbox.config.timeout = Duration::from_millis(300);

        let response = sandbox.run(&request(vec![json!(1)])).await.unwrap();

        assert_eq!(response, SandboxResponse::TimedOut(Duration::from_millis(300)));
        assert_reaped(sandbox.config.scratch_dir.join("background.pid")).await;
    }

    #[tokio::test]
    async fn test_background_children_do_not_outlive_run() {
        let sandbox = shell(
            r#"sleep 30 >/dev/null 2>&1 & echo $! > background.pid; cat >/dev/null; echo '{"ok":1}'"#,
        );

        let response = sandbox.run(&request(vec![json!(1)])).await.unwrap();

        assert_eq!(response, SandboxResponse::Output(json!(1)));
        assert_reaped(sandbox.config.scratch_dir.join("background.pid")).await;
    }

    #[tokio::test]
    async fn test_output_limit() {
        let mut sandbox = shell("head -c 4096 /dev/zero | tr '\\0' 'x'");
        sandbox.config.max_output_bytes = 128;
        let response = sandbox.run(&request(vec![json!(1)])).await.unwrap();
        assert!(matches!(response, SandboxResponse::Error(msg) if msg.contains("128")));
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let sandbox = shell("echo not-json");
        let err = sandbox.run(&request(vec![json!(1)])).await.unwrap_err();
        assert!(matches!(err, SandboxError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_empty_command() {
        let sandbox = Sandbox::new(SandboxConfig {
            command: Vec::new(),
            ..SandboxConfig::default()
        });
        let err = sandbox.run(&request(vec![json!(1)])).await.unwrap_err();
        assert!(matches!(err, SandboxError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_candidate_through_runner() {
        let sandbox = Arc::new(shell(r#"cat >/dev/null; echo '{"ok":1}'"#));
        let candidate = SandboxCandidate::new(sandbox, "function factorial(n) { return 1; }", "factorial");
        let problem = Catalog::builtin().unwrap().lookup("factorial").unwrap();

        let verdict = ValidationRunner::default()
            .validate(&candidate, problem, &CancelToken::never())
            .await;

        let failure = verdict.failure().unwrap();
        assert_eq!(failure.index, 2);
        assert_eq!(failure.args, vec![json!(3)]);
        assert_eq!(failure.actual, Some(json!(1)));
        assert_eq!(failure.reason, FailureReason::Mismatch);
    }

    // ==================== node 端到端 ====================

    async fn validate_with_node(source: &str, problem_id: &str) -> Option<Verdict> {
        let sandbox = Arc::new(Sandbox::node_for_tests()?);
        let problem = Catalog::builtin().unwrap().lookup(problem_id).unwrap();
        let candidate = SandboxCandidate::new(sandbox, source, crate::services::catalog::entry_point(problem).unwrap());
        Some(
            ValidationRunner::default()
                .validate(&candidate, problem, &CancelToken::never())
                .await,
        )
    }

    #[tokio::test]
    async fn test_node_factorial_passes() {
        let source = r#"function factorial(n){
  console.log("computing", n);
  return n <= 1 ? 1 : n * factorial(n - 1);
};"#;
        let Some(verdict) = validate_with_node(source, "factorial").await else {
            return;
        };
        assert!(verdict.is_pass(), "{:?}", verdict);
    }

    #[tokio::test]
    async fn test_node_palindrome_passes() {
        let source = r#"function isPalindrome(x){
  if (x < 0) return false;
  const s = String(x);
  return s === s.split("").reverse().join("");
};"#;
        let Some(verdict) = validate_with_node(source, "palindrome-number").await else {
            return;
        };
        assert!(verdict.is_pass(), "{:?}", verdict);
    }

    #[tokio::test]
    async fn test_node_reports_mismatch_at_seven() {
        let source = r#"function factorial(n){
  const r = n <= 1 ? 1 : n * factorial(n - 1);
  return n === 7 ? r - 1 : r;
};"#;
        let Some(verdict) = validate_with_node(source, "factorial").await else {
            return;
        };
        let failure = verdict.failure().unwrap();
        assert_eq!(failure.index, 4);
        assert_eq!(failure.args, vec![json!(7)]);
        assert_eq!(failure.expected, json!(5040));
        assert_eq!(failure.actual, Some(json!(5039)));
        assert_eq!(failure.reason, FailureReason::Mismatch);
    }

    #[tokio::test]
    async fn test_node_thrown_error_is_raised() {
        let source = r#"function factorial(n){ throw new Error("boom"); };"#;
        let Some(verdict) = validate_with_node(source, "factorial").await else {
            return;
        };
        let failure = verdict.failure().unwrap();
        assert_eq!(failure.index, 0);
        assert_eq!(failure.actual, None);
        assert!(matches!(&failure.reason, FailureReason::Raised { message } if message.contains("boom")));
    }

    #[tokio::test]
    async fn test_node_cannot_spawn_processes_or_write_files() {
        let marker = std::env::temp_dir().join(format!("practice-hub-escape-{}", Uuid::new_v4()));
        let marker = marker.to_string_lossy().to_string();

        let attempts = [
            format!(
                r#"function factorial(n){{ require("child_process").execSync("touch {}"); return 1; }};"#,
                marker
            ),
            format!(
                r#"function factorial(n){{ require("fs").writeFileSync("{}", "x"); return 1; }};"#,
                marker
            ),
        ];

        for source in &attempts {
            let Some(verdict) = validate_with_node(source, "factorial").await else {
                return;
            };
            let failure = verdict.failure().unwrap();
            assert_eq!(failure.index, 0);
            assert!(
                matches!(failure.reason, FailureReason::Raised { .. }),
                "{:?}",
                failure
            );
            assert!(!std::path::Path::new(&marker).exists());
        }
    }
}
