use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Input parameters of a task, interpreted entirely by the resolved agent.
pub type Payload = Map<String, Value>;

/// Lifecycle marker of a [`Task`].
///
/// Transitions are single-direction: `queued → running → done | failed`,
/// plus `queued → failed` when no agent can be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting to be picked up.
    #[default]
    Queued,
    /// Being executed by an agent.
    Running,
    /// Execution finished. The result may still carry an error.
    Done,
    /// The task could not be dispatched or was abandoned.
    Failed,
}

impl TaskStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// Whether moving from `self` to `next` respects the lifecycle.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Queued, TaskStatus::Running)
                | (TaskStatus::Queued, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Done)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of executing a [`Task`].
///
/// When `error` is set, `output` must be ignored; [`TaskResult::output`]
/// enforces this by returning `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Success payload.
    #[serde(default)]
    pub output: Value,
    /// Error reported by the agent or folded in by the scheduler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    /// Creates a successful result.
    pub fn success(output: impl Into<Value>) -> Self {
        Self {
            output: output.into(),
            error: None,
        }
    }

    /// Creates an error result with no output.
    pub fn failure(error: impl ToString) -> Self {
        Self {
            output: Value::Null,
            error: Some(error.to_string()),
        }
    }

    /// Creates an error result that keeps diagnostic output (exit codes, stderr).
    pub fn failure_with_output(error: impl ToString, output: impl Into<Value>) -> Self {
        Self {
            output: output.into(),
            error: Some(error.to_string()),
        }
    }

    /// Whether the result carries an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The output, or `None` when an error is set.
    pub fn output(&self) -> Option<&Value> {
        if self.is_error() {
            None
        } else {
            Some(&self.output)
        }
    }
}

/// A unit of work routed to the first agent that supports its category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: Uuid,
    /// Kind of work; used for capability matching.
    pub category: String,
    /// Input parameters.
    #[serde(default)]
    pub payload: Payload,
    /// Lifecycle marker, mutated only by the component executing the task.
    #[serde(default)]
    pub status: TaskStatus,
    /// Set exactly once, on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    /// UTC timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a queued task with an empty payload.
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: category.into(),
            payload: Payload::new(),
            status: TaskStatus::Queued,
            result: None,
            created_at: Utc::now(),
        }
    }

    /// Replaces the payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Sets a single payload entry.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Looks up a string payload entry.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Moves the task to `next` if the lifecycle allows it.
    ///
    /// Returns `false` and leaves the task untouched otherwise.
    pub fn transition(&mut self, next: TaskStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// `queued → running`.
    pub fn mark_running(&mut self) -> bool {
        self.transition(TaskStatus::Running)
    }

    /// `running → done`, storing the result.
    pub fn complete(&mut self, result: TaskResult) -> bool {
        self.finish(TaskStatus::Done, result)
    }

    /// `queued | running → failed`, storing the result.
    pub fn fail(&mut self, result: TaskResult) -> bool {
        self.finish(TaskStatus::Failed, result)
    }

    fn finish(&mut self, status: TaskStatus, result: TaskResult) -> bool {
        if self.result.is_some() || !self.transition(status) {
            return false;
        }
        self.result = Some(result);
        true
    }
}
