use crate::registry::{AgentRegistry, ConnectorInfo};
use crate::scheduler::Scheduler;
use crate::workflow::{StepResult, StepStatus, Workflow, WorkflowResult, WorkflowStatus};
use agentic_core::{AgenticResult, CancellationToken, Task, TaskResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Executes tasks inline and runs multi-step workflows against a registry.
///
/// Each orchestrator owns its registry handle; several orchestrators and
/// schedulers can coexist in one process without sharing hidden state.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Describe every registered connector.
    pub fn list_connectors(&self) -> Vec<ConnectorInfo> {
        self.registry.list_connectors()
    }

    /// Create a scheduler that dispatches to the same registry.
    pub fn scheduler(&self, queue_capacity: usize) -> Scheduler {
        Scheduler::new(self.registry.clone(), queue_capacity)
    }

    /// Resolve an agent for the task's category and execute the task inline.
    pub async fn execute_task(
        &self,
        task: &Task,
        cancel: CancellationToken,
    ) -> AgenticResult<TaskResult> {
        let agent = self.registry.select(&task.category)?;
        agent.execute(task, cancel).await
    }

    /// Run a workflow to completion on the calling task.
    pub async fn run_workflow(&self, workflow: &Workflow) -> WorkflowResult {
        self.run_workflow_with_cancel(workflow, CancellationToken::new())
            .await
    }

    /// Run a workflow, passing `cancel` to every agent invocation.
    ///
    /// Steps execute strictly in list order; `depends_on` is not consulted.
    /// A step whose agent cannot be resolved, or whose execution returns an
    /// error, aborts the run regardless of `continue_on_error`. A step whose
    /// result carries an error aborts the run unless `continue_on_error` is
    /// set. Steps after an abort are absent from the result.
    pub async fn run_workflow_with_cancel(
        &self,
        workflow: &Workflow,
        cancel: CancellationToken,
    ) -> WorkflowResult {
        let start = Instant::now();
        info!(workflow_id = %workflow.id, steps = workflow.steps.len(), "Workflow: starting");

        for issue in workflow.dependency_issues() {
            warn!(workflow_id = %workflow.id, issue = %issue, "Workflow: dependency declaration ignored");
        }

        let mut result = WorkflowResult::new(&workflow.id);
        result.steps.reserve(workflow.steps.len());

        for (i, step) in workflow.steps.iter().enumerate() {
            let order = i + 1;
            let mut step_result = StepResult::pending(step, order);
            let mut task = step.to_task();

            step_result.status = StepStatus::Running;
            task.mark_running();
            info!(workflow_id = %workflow.id, step = %step.id, order, category = %task.category, "Workflow: executing step");

            let task_result = match self.execute_task(&task, cancel.clone()).await {
                Ok(task_result) => task_result,
                Err(e) => {
                    error!(workflow_id = %workflow.id, step = %step.id, error = %e, "Workflow: step failed");
                    task.fail(TaskResult::failure(&e));
                    step_result.status = StepStatus::Failed;
                    step_result.error = Some(e.to_string());
                    result.steps.push(step_result);
                    result.status = WorkflowStatus::Failed;
                    result.error = Some(format!("workflow step {order} failed: {e}"));
                    return result;
                }
            };

            step_result.status = StepStatus::Completed;
            step_result.output = task_result.output.clone();
            step_result.error = task_result.error.clone();
            task.complete(task_result);
            result.steps.push(step_result);

            if let Some(soft) = task.result.as_ref().and_then(|r| r.error.as_deref()) {
                if !step.continue_on_error {
                    error!(workflow_id = %workflow.id, step = %step.id, error = %soft, "Workflow: step reported an error");
                    result.status = WorkflowStatus::Failed;
                    result.error = Some(format!("workflow step {order} had error: {soft}"));
                    return result;
                }
                warn!(workflow_id = %workflow.id, step = %step.id, error = %soft, "Workflow: step reported an error, continuing");
            }
        }

        result.status = WorkflowStatus::Completed;
        info!(
            workflow_id = %workflow.id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Workflow: complete"
        );
        result
    }
}
