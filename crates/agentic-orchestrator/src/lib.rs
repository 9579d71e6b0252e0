//! Task scheduling and workflow orchestration over a registry of agents.
//!
//! Agents (connectors to infrastructure and inference backends) are kept in
//! an ordered [`AgentRegistry`]; a task goes to the first agent that supports
//! its category. Tasks can be queued on a worker-pool [`Scheduler`] or run as
//! steps of a [`Workflow`] by the [`Orchestrator`].
//!
//! # Main types
//!
//! - [`AgentRegistry`] — Ordered, first-match capability resolution.
//! - [`Scheduler`] — Bounded FIFO queue drained by a fixed worker pool.
//! - [`TaskHandle`] — Pollable view of a scheduled task.
//! - [`Orchestrator`] — Sequential workflow executor with continue-on-error policy.
//! - [`Workflow`] / [`WorkflowResult`] — Step definitions and their aggregated outcome.
//! - [`create_vm_workflow`] — Builds a provisioning workflow from a declarative config.

/// Workflow execution engine.
pub mod engine;
/// VM provisioning workflow builder.
pub mod provisioning;
/// Agent registry and connector listing.
pub mod registry;
/// Worker-pool task scheduler.
pub mod scheduler;
/// Workflow, step, and result types.
pub mod workflow;

pub use engine::Orchestrator;
pub use provisioning::{create_vm_workflow, ContainerConfig, K8sManifestConfig, VmWorkflowConfig};
pub use registry::{AgentRegistry, ConnectorInfo, KNOWN_CATEGORIES};
pub use scheduler::{Scheduler, TaskHandle};
pub use workflow::{
    DependencyIssue, StepResult, StepStatus, Workflow, WorkflowResult, WorkflowStatus,
    WorkflowStep,
};
