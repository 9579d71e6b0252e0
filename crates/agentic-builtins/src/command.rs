use agentic_core::{
    Agent, AgenticError, AgenticResult, CancellationToken, ConnectorKind, Payload, Task,
    TaskResult,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

const MAX_STDOUT: usize = 50_000;
const MAX_STDERR: usize = 10_000;

/// Arguments and optional stdin for one process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new(args: Vec<String>) -> Self {
        Self { args, stdin: None }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

/// Turns a task payload into process arguments.
///
/// An `Err` is an invalid payload; the agent reports it as an error inside
/// the task result without spawning anything.
pub type InvocationBuilder = Arc<dyn Fn(&Payload) -> Result<Invocation, String> + Send + Sync>;

/// Process-exec connector. Runs `program <global args> <invocation args>`.
///
/// With the default builder the payload is `{"action": "...", "args": [...]}`
/// and the invocation is `<action> <args...>`; an optional `stdin` string is
/// piped to the child.
///
/// - Spawn failure or timeout is an execution error.
/// - Cancellation kills the child and returns [`AgenticError::Cancelled`].
/// - A non-zero exit is reported in the result, with
///   `{exit_code, stdout, stderr}` kept as output.
pub struct CommandAgent {
    name: String,
    program: String,
    global_args: Vec<String>,
    env: Vec<(String, String)>,
    categories: Vec<String>,
    kind: ConnectorKind,
    timeout: Duration,
    builder: InvocationBuilder,
}

impl CommandAgent {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            global_args: Vec::new(),
            env: Vec::new(),
            categories: Vec::new(),
            kind: ConnectorKind::Infrastructure,
            timeout: Duration::from_secs(300),
            builder: Arc::new(action_invocation),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments placed before every invocation (e.g. `--context prod`).
    pub fn with_global_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Extra environment variable for the child. The parent environment is inherited.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_kind(mut self, kind: ConnectorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_invocation<F>(mut self, builder: F) -> Self
    where
        F: Fn(&Payload) -> Result<Invocation, String> + Send + Sync + 'static,
    {
        self.builder = Arc::new(builder);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn global_args(&self) -> &[String] {
        &self.global_args
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full argument list the payload would produce.
    pub fn command_line(&self, payload: &Payload) -> Result<Vec<String>, String> {
        let invocation = (self.builder)(payload)?;
        Ok(self
            .global_args
            .iter()
            .cloned()
            .chain(invocation.args)
            .collect())
    }

    async fn run(
        &self,
        invocation: Invocation,
        cancel: &CancellationToken,
    ) -> AgenticResult<std::process::Output> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.global_args)
            .args(&invocation.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            AgenticError::Agent(format!("{}: failed to spawn '{}': {e}", self.name, self.program))
        })?;

        if let (Some(input), Some(mut stdin)) = (invocation.stdin, child.stdin.take()) {
            // Written concurrently so a child that fills its stdout pipe before
            // reading stdin cannot deadlock us.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    warn!(error = %e, "Failed to write child stdin");
                }
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgenticError::Cancelled),
            output = tokio::time::timeout(self.timeout, child.wait_with_output()) => match output {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(AgenticError::Agent(format!(
                    "{}: failed to wait for '{}': {e}",
                    self.name, self.program
                ))),
                Err(_) => Err(AgenticError::Agent(format!(
                    "{}: command timed out after {}s",
                    self.name,
                    self.timeout.as_secs()
                ))),
            },
        }
    }
}

#[async_trait]
impl Agent for CommandAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn execute(&self, task: &Task, cancel: CancellationToken) -> AgenticResult<TaskResult> {
        let invocation = match (self.builder)(&task.payload) {
            Ok(invocation) => invocation,
            Err(reason) => {
                warn!(agent = %self.name, task_id = %task.id, reason = %reason, "Invalid task payload");
                return Ok(TaskResult::failure(format!("invalid task payload: {reason}")));
            }
        };

        info!(
            agent = %self.name,
            task_id = %task.id,
            program = %self.program,
            args = ?invocation.args,
            timeout = self.timeout.as_secs(),
            "Executing command"
        );

        let output = self.run(invocation, &cancel).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        let mut response = json!({
            "exit_code": exit_code,
            "stdout": truncate_output(&stdout, MAX_STDOUT),
            "stderr": truncate_output(&stderr, MAX_STDERR),
        });
        if let (Some(action), Value::Object(map)) = (task.param_str("action"), &mut response) {
            map.insert("action".to_string(), Value::from(action));
        }

        if output.status.success() {
            Ok(TaskResult::success(response))
        } else {
            warn!(agent = %self.name, task_id = %task.id, exit_code, "Command exited with failure");
            let detail = stderr.trim();
            let message = if detail.is_empty() {
                format!("command exited with status {exit_code}")
            } else {
                format!(
                    "command exited with status {exit_code}: {}",
                    truncate_output(detail, 500)
                )
            };
            Ok(TaskResult::failure_with_output(message, response))
        }
    }
}

/// Default builder: `<action> <args...>`, optional `stdin`.
pub fn action_invocation(payload: &Payload) -> Result<Invocation, String> {
    let action = required_str(payload, "action")?;
    let mut args = vec![action.to_string()];
    args.extend(string_list(payload, "args")?);
    let invocation = Invocation::new(args);
    Ok(match payload.get("stdin").and_then(Value::as_str) {
        Some(stdin) => invocation.with_stdin(stdin),
        None => invocation,
    })
}

pub(crate) fn required_str<'a>(payload: &'a Payload, key: &str) -> Result<&'a str, String> {
    match payload.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) | None => Err(format!("missing required parameter '{key}'")),
        Some(other) => Err(format!("parameter '{key}' must be a string, got {other}")),
    }
}

pub(crate) fn optional_str<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Read `key` as a list of arguments. Scalars are stringified; a lone string
/// counts as a one-element list.
pub(crate) fn string_list(payload: &Payload, key: &str) -> Result<Vec<String>, String> {
    match payload.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(format!("parameter '{key}' contains a non-scalar value: {other}")),
            })
            .collect(),
        Some(other) => Err(format!("parameter '{key}' must be a list, got {other}")),
    }
}

fn truncate_output(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, {} total bytes]", &s[..end], s.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    fn sh() -> CommandAgent {
        CommandAgent::new("sh", "sh")
            .with_categories(["shell"])
            .with_timeout(Duration::from_secs(10))
    }

    #[test]
    fn test_action_invocation() {
        let inv = action_invocation(&payload(json!({"action": "ps", "args": ["-a", 3, true]})))
            .unwrap();
        assert_eq!(inv.args, vec!["ps", "-a", "3", "true"]);
        assert!(inv.stdin.is_none());
    }

    #[test]
    fn test_action_invocation_rejects_bad_payloads() {
        assert!(action_invocation(&Payload::new())
            .unwrap_err()
            .contains("'action'"));
        assert!(action_invocation(&payload(json!({"action": 5}))).is_err());
        assert!(action_invocation(&payload(json!({"action": "x", "args": {"a": 1}}))).is_err());
    }

    #[test]
    fn test_command_line_prepends_global_args() {
        let agent = CommandAgent::new("kubectl", "kubectl").with_global_args(["--context", "prod"]);
        let line = agent
            .command_line(&payload(json!({"action": "get", "args": ["pods"]})))
            .unwrap();
        assert_eq!(line, vec!["--context", "prod", "get", "pods"]);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "ééééé";
        let out = truncate_output(s, 3);
        assert!(out.starts_with('é'));
        assert!(out.contains("10 total bytes"));
        assert_eq!(truncate_output("short", 10), "short");
    }

    #[tokio::test]
    async fn test_successful_command() {
        let task = Task::new("shell").with_payload(payload(json!({
            "action": "-c",
            "args": ["echo hello"]
        })));
        let result = sh().execute(&task, CancellationToken::new()).await.unwrap();
        assert!(!result.is_error());
        assert_eq!(result.output["exit_code"], 0);
        assert_eq!(result.output["stdout"], "hello\n");
        assert_eq!(result.output["action"], "-c");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_soft_error() {
        let task = Task::new("shell").with_payload(payload(json!({
            "action": "-c",
            "args": ["echo oops >&2; exit 3"]
        })));
        let result = sh().execute(&task, CancellationToken::new()).await.unwrap();
        assert_eq!(
            result.error.as_deref(),
            Some("command exited with status 3: oops")
        );
        assert_eq!(result.output["exit_code"], 3);
        assert_eq!(result.output["stderr"], "oops\n");
        assert!(result.output().is_none());
    }

    #[tokio::test]
    async fn test_stdin_is_piped() {
        let task = Task::new("shell").with_payload(payload(json!({
            "action": "-c",
            "args": ["cat"],
            "stdin": "kind: Service\n"
        })));
        let result = sh().execute(&task, CancellationToken::new()).await.unwrap();
        assert_eq!(result.output["stdout"], "kind: Service\n");
    }

    #[tokio::test]
    async fn test_invalid_payload_is_soft_error() {
        let result = sh()
            .execute(&Task::new("shell"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            result.error.as_deref(),
            Some("invalid task payload: missing required parameter 'action'")
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_execution_error() {
        let agent = CommandAgent::new("ghost", "definitely-not-a-real-binary-7f3a");
        let task = Task::new("x").with_param("action", "run");
        let err = agent.execute(&task, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, AgenticError::Agent(_)));
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_timeout_is_execution_error() {
        let agent = sh().with_timeout(Duration::from_millis(200));
        let task = Task::new("shell").with_payload(payload(json!({
            "action": "-c",
            "args": ["sleep 10"]
        })));
        let err = agent.execute(&task, CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cancellation_kills_child() {
        let cancel = CancellationToken::new();
        let task = Task::new("shell").with_payload(payload(json!({
            "action": "-c",
            "args": ["sleep 10"]
        })));
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let start = std::time::Instant::now();
        let err = sh().execute(&task, cancel).await.unwrap_err();
        assert!(matches!(err, AgenticError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_supports_configured_categories() {
        let agent = CommandAgent::new("docker", "docker").with_categories(["container", "docker"]);
        assert!(agent.supports("container"));
        assert!(!agent.supports("vm"));
        assert_eq!(agent.kind(), ConnectorKind::Infrastructure);
    }
}
