use agentic_core::{AgenticError, AgenticResult, Payload, Task};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

/// One unit of a [`Workflow`]: a task plus its continuation policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    /// Category of the task this step becomes (vm, container, kubernetes, ...).
    #[serde(rename = "task_type")]
    pub task_category: String,
    #[serde(default)]
    pub parameters: Payload,
    /// Step IDs this step logically depends on.
    ///
    /// Informational only: steps always run in list order.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// When true, an error reported inside a successful result does not abort
    /// the workflow. Dispatch and execution failures always abort.
    #[serde(default)]
    pub continue_on_error: bool,
}

impl WorkflowStep {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        task_category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            task_category: task_category.into(),
            ..Default::default()
        }
    }

    pub fn with_parameters(mut self, parameters: Payload) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    /// Build the task executed for this step.
    pub fn to_task(&self) -> Task {
        Task::new(&self.task_category).with_payload(self.parameters.clone())
    }
}

/// A problem with declared step dependencies.
///
/// Dependencies are never enforced, so these only describe where list order
/// and the declared graph disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyIssue {
    /// Two steps share an ID.
    DuplicateStepId { step_id: String },
    /// A step depends on an ID no step has.
    UnknownDependency { step_id: String, depends_on: String },
    /// A step depends on a step listed after it, so it will run first anyway.
    ForwardReference { step_id: String, depends_on: String },
}

impl std::fmt::Display for DependencyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyIssue::DuplicateStepId { step_id } => {
                write!(f, "duplicate step id '{step_id}'")
            }
            DependencyIssue::UnknownDependency {
                step_id,
                depends_on,
            } => write!(f, "step '{step_id}' depends on unknown step '{depends_on}'"),
            DependencyIssue::ForwardReference {
                step_id,
                depends_on,
            } => write!(
                f,
                "step '{step_id}' depends on '{depends_on}', which is listed after it"
            ),
        }
    }
}

impl Workflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn add_step(&mut self, step: WorkflowStep) {
        self.steps.push(step);
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Load a workflow definition from a `.json` or `.toml` file.
    pub fn from_file(path: impl AsRef<Path>) -> AgenticResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| {
                AgenticError::Workflow(format!("Invalid workflow '{}': {e}", path.display()))
            }),
            _ => Ok(serde_json::from_str(&content)?),
        }
    }

    /// Get a step by ID (first match).
    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Compare declared dependencies against list order.
    pub fn dependency_issues(&self) -> Vec<DependencyIssue> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut issues = Vec::new();

        for (i, step) in self.steps.iter().enumerate() {
            if positions.insert(step.id.as_str(), i).is_some() {
                issues.push(DependencyIssue::DuplicateStepId {
                    step_id: step.id.clone(),
                });
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            for dep in &step.depends_on {
                match positions.get(dep.as_str()) {
                    None => issues.push(DependencyIssue::UnknownDependency {
                        step_id: step.id.clone(),
                        depends_on: dep.clone(),
                    }),
                    Some(&pos) if pos >= i => issues.push(DependencyIssue::ForwardReference {
                        step_id: step.id.clone(),
                        depends_on: dep.clone(),
                    }),
                    Some(_) => {}
                }
            }
        }

        issues
    }
}

/// Overall state of a workflow run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

/// State of a single step within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub name: String,
    /// 1-based position in the workflow.
    pub order: usize,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub output: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn pending(step: &WorkflowStep, order: usize) -> Self {
        Self {
            step_id: step.id.clone(),
            name: step.name.clone(),
            order,
            status: StepStatus::Pending,
            output: serde_json::Value::Null,
            error: None,
        }
    }
}

/// Aggregate result of a workflow run.
///
/// `steps` holds one entry per step that was attempted, in execution order.
/// When the run aborts, steps after the aborting one are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub steps: Vec<StepResult>,
    /// Why the run aborted, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResult {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            ..Default::default()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }

    /// Result for a step by ID, if it was attempted.
    pub fn step(&self, step_id: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}
