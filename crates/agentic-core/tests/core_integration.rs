#![allow(clippy::unwrap_used, clippy::expect_used)]

use agentic_core::*;
use async_trait::async_trait;
use serde_json::json;

// ---------------------------------------------------------------------------
// 1. Task serialization keeps lifecycle and result
// ---------------------------------------------------------------------------

#[test]
fn task_serialization_roundtrip() {
    let mut task = Task::new("container")
        .with_param("action", "run")
        .with_param("image", "nginx:latest");
    task.mark_running();
    task.complete(TaskResult::success(json!({"container_id": "abc123"})));

    let json = serde_json::to_string(&task).unwrap();
    assert!(json.contains("\"status\":\"done\""));

    let parsed: Task = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.id, task.id);
    assert_eq!(parsed.status, TaskStatus::Done);
    assert_eq!(parsed.param_str("image"), Some("nginx:latest"));
    assert_eq!(
        parsed.result.unwrap().output(),
        Some(&json!({"container_id": "abc123"}))
    );
}

#[test]
fn task_defaults_when_deserialized_from_minimal_json() {
    let parsed: Task = serde_json::from_value(json!({
        "id": "6f1c1e4e-8f5e-4a8e-9d2c-1b1f0c6c7d3a",
        "category": "echo",
        "created_at": "2024-01-01T00:00:00Z"
    }))
    .unwrap();
    assert_eq!(parsed.status, TaskStatus::Queued);
    assert!(parsed.payload.is_empty());
    assert!(parsed.result.is_none());
}

// ---------------------------------------------------------------------------
// 2. Error Display and From impls
// ---------------------------------------------------------------------------

#[test]
fn error_display_and_from_impls() {
    let err = AgenticError::NoCapableAgent {
        category: "quantum".to_string(),
    };
    assert_eq!(err.to_string(), "no agent supports task type: quantum");
    assert!(err.is_resolution());

    let agent_err = AgenticError::Agent("connection refused".to_string());
    assert_eq!(agent_err.to_string(), "Agent error: connection refused");
    assert!(!agent_err.is_resolution());

    assert_eq!(
        AgenticError::Scheduler("stopped".into()).to_string(),
        "Scheduler error: stopped"
    );
    assert_eq!(AgenticError::Cancelled.to_string(), "Task cancelled");

    let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let err: AgenticError = serde_err.into();
    assert!(err.to_string().starts_with("JSON error:"));

    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "kubectl missing");
    let err: AgenticError = io_err.into();
    assert!(err.to_string().starts_with("IO error:"));
}

// ---------------------------------------------------------------------------
// 3. Agent trait objects are usable behind Arc<dyn Agent>
// ---------------------------------------------------------------------------

struct Upper;

#[async_trait]
impl Agent for Upper {
    fn name(&self) -> &str {
        "upper"
    }

    fn supports(&self, category: &str) -> bool {
        category == "text"
    }

    async fn execute(&self, task: &Task, cancel: CancellationToken) -> AgenticResult<TaskResult> {
        if cancel.is_cancelled() {
            return Err(AgenticError::Cancelled);
        }
        let text = task
            .param_str("text")
            .ok_or_else(|| AgenticError::Agent("missing text".into()))?;
        Ok(TaskResult::success(text.to_uppercase()))
    }
}

#[tokio::test]
async fn agent_trait_object_dispatch() {
    let agent: std::sync::Arc<dyn Agent> = std::sync::Arc::new(Upper);
    assert_eq!(agent.kind(), ConnectorKind::Unknown);
    assert!(agent.supports("text"));
    assert!(!agent.supports("vm"));

    let task = Task::new("text").with_param("text", "hello");
    let result = agent.execute(&task, CancellationToken::new()).await.unwrap();
    assert_eq!(result.output(), Some(&json!("HELLO")));

    let missing = agent
        .execute(&Task::new("text"), CancellationToken::new())
        .await;
    assert!(matches!(missing, Err(AgenticError::Agent(_))));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let cancelled = agent.execute(&task, cancel).await;
    assert!(matches!(cancelled, Err(AgenticError::Cancelled)));
}
