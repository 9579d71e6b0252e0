use crate::task::{Task, TaskResult};
use crate::AgenticResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Broad classification of a connector, used when listing what is registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// Reasoning / inference backends.
    Llm,
    /// Container, cluster, VM, and package-manager backends.
    Infrastructure,
    /// Anything not classified above.
    #[default]
    Unknown,
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorKind::Llm => write!(f, "llm"),
            ConnectorKind::Infrastructure => write!(f, "infrastructure"),
            ConnectorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A capability provider: any backend that can report whether it handles a
/// task category and execute tasks of that category.
///
/// `supports` must be a pure predicate; it is called under the registry's
/// read lock and may run concurrently from many callers. `execute` may block
/// on I/O for as long as the backend needs and must tolerate concurrent calls
/// to other agents' `execute`.
///
/// Returning `Err` signals an execution failure (transport error, backend
/// rejection). A logical failure the backend itself reports belongs in
/// [`TaskResult::error`] of an `Ok` value instead.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identity of this agent.
    fn name(&self) -> &str;

    /// Whether this agent can handle tasks of `category`.
    fn supports(&self, category: &str) -> bool;

    /// Connector classification. Defaults to [`ConnectorKind::Unknown`].
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Unknown
    }

    /// Execute a task. Agents should observe `cancel` and stop early when it fires.
    async fn execute(&self, task: &Task, cancel: CancellationToken) -> AgenticResult<TaskResult>;
}
