//! Core types and error definitions for the Agentic orchestration layer.
//!
//! This crate provides the foundational types shared across all Agentic crates:
//! the unit of work, its outcome, the capability-provider trait implemented by
//! every backend connector, and the unified error type.
//!
//! # Main types
//!
//! - [`AgenticError`] — Unified error enum for registry, scheduler, and workflow failures.
//! - [`AgenticResult`] — Convenience alias for `Result<T, AgenticError>`.
//! - [`Task`] — A unit of work routed to an agent by category.
//! - [`TaskResult`] — The outcome of executing a [`Task`].
//! - [`Agent`] — Trait implemented by every capability provider.

/// Capability-provider trait and connector classification.
pub mod agent;
/// Task lifecycle and result types.
pub mod task;

pub use agent::{Agent, ConnectorKind};
pub use task::{Payload, Task, TaskResult, TaskStatus};
pub use tokio_util::sync::CancellationToken;

// --- Error types ---

/// Top-level error type for the Agentic orchestration layer.
///
/// Application-level failures reported by a provider inside a successful
/// [`TaskResult`] are not represented here; they travel as
/// [`TaskResult::error`].
#[derive(Debug, thiserror::Error)]
pub enum AgenticError {
    /// No registered agent supports the requested task category.
    #[error("no agent supports task type: {category}")]
    NoCapableAgent {
        /// The category that could not be resolved.
        category: String,
    },

    /// A provider failed to execute a task (transport failure, backend rejection).
    #[error("Agent error: {0}")]
    Agent(String),

    /// The scheduler refused or abandoned a task.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// A workflow definition could not be loaded or executed.
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// Execution was interrupted by a cancellation signal.
    #[error("Task cancelled")]
    Cancelled,

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgenticError {
    /// Returns `true` for resolution failures ([`AgenticError::NoCapableAgent`]).
    pub fn is_resolution(&self) -> bool {
        matches!(self, AgenticError::NoCapableAgent { .. })
    }
}

/// A convenience `Result` alias using [`AgenticError`].
pub type AgenticResult<T> = Result<T, AgenticError>;
