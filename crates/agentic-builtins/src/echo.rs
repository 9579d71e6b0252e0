use agentic_core::{Agent, AgenticResult, CancellationToken, Task, TaskResult};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Echo agent. Returns the task payload unchanged as its output.
///
/// Handles the `echo` category only. Useful for wiring checks and smoke tests
/// of a scheduler or workflow without touching any backend.
pub struct EchoAgent;

impl EchoAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EchoAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        "echo"
    }

    fn supports(&self, category: &str) -> bool {
        category == "echo"
    }

    async fn execute(&self, task: &Task, _cancel: CancellationToken) -> AgenticResult<TaskResult> {
        debug!(task_id = %task.id, keys = task.payload.len(), "Echoing payload");
        Ok(TaskResult::success(Value::Object(task.payload.clone())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use agentic_core::ConnectorKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_returns_payload() {
        let task = Task::new("echo").with_param("x", 1).with_param("tag", "a");
        let result = EchoAgent::new()
            .execute(&task, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.output(), Some(&json!({"x": 1, "tag": "a"})));
    }

    #[tokio::test]
    async fn test_echo_empty_payload() {
        let result = EchoAgent::new()
            .execute(&Task::new("echo"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.output, json!({}));
    }

    #[test]
    fn test_echo_supports_only_echo() {
        let agent = EchoAgent::new();
        assert!(agent.supports("echo"));
        assert!(!agent.supports("llm"));
        assert_eq!(agent.kind(), ConnectorKind::Unknown);
    }
}
