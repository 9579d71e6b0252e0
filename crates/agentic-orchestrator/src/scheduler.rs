use crate::registry::AgentRegistry;
use agentic_core::{
    AgenticError, AgenticResult, CancellationToken, Payload, Task, TaskResult, TaskStatus,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pollable, cloneable view of a task owned by the [`Scheduler`].
///
/// Only the worker that dequeues the task mutates it; callers read the status
/// and result, or await [`TaskHandle::wait`] for the terminal state.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<TaskCell>,
}

struct TaskCell {
    id: Uuid,
    task: RwLock<Task>,
    status: watch::Sender<TaskStatus>,
}

impl TaskHandle {
    fn new(task: Task) -> Self {
        let (status, _) = watch::channel(task.status);
        Self {
            inner: Arc::new(TaskCell {
                id: task.id,
                task: RwLock::new(task),
                status,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.task.read().status
    }

    /// The result, once the task has reached a terminal state.
    pub fn result(&self) -> Option<TaskResult> {
        self.inner.task.read().result.clone()
    }

    /// A copy of the task as it is right now.
    pub fn snapshot(&self) -> Task {
        self.inner.task.read().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Wait until the task is `done` or `failed` and return its final state.
    pub async fn wait(&self) -> Task {
        let mut status = self.inner.status.subscribe();
        // The sender lives in `inner`, so the channel cannot close while we hold it.
        let _ = status.wait_for(|s| s.is_terminal()).await;
        self.snapshot()
    }

    fn category(&self) -> String {
        self.inner.task.read().category.clone()
    }

    /// Apply a lifecycle change and publish the new status if it took effect.
    fn update(&self, change: impl FnOnce(&mut Task) -> bool) -> bool {
        let mut task = self.inner.task.write();
        let changed = change(&mut task);
        if changed {
            self.inner.status.send_replace(task.status);
        }
        changed
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}

/// Bounded FIFO work queue drained by a fixed pool of worker tasks.
///
/// Tasks are dequeued in submission order, but with more than one worker
/// their completion order is not guaranteed: B may finish before A even when
/// A was scheduled first.
///
/// Failures never crash a worker. A task whose category no agent supports
/// becomes `failed`; an execution error is folded into the result of a `done`
/// task. Nothing is retried.
pub struct Scheduler {
    registry: Arc<AgentRegistry>,
    capacity: usize,
    sender: Mutex<Option<mpsc::Sender<TaskHandle>>>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<TaskHandle>>>,
    cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler whose queue holds at most `queue_capacity` tasks
    /// (minimum 1). No workers run until [`Scheduler::run`] is called.
    pub fn new(registry: Arc<AgentRegistry>, queue_capacity: usize) -> Self {
        let capacity = queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            registry,
            capacity,
            sender: Mutex::new(Some(sender)),
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Enqueue a task.
    ///
    /// **Blocks** (awaits) while the queue is full, until a worker frees a
    /// slot. There is no drop policy and no overflow error; wrap the call in
    /// `tokio::time::timeout` or `tokio::select!` if you cannot wait.
    ///
    /// Fails if the scheduler has been stopped or the task is not `queued`.
    pub async fn schedule(&self, task: Task) -> AgenticResult<TaskHandle> {
        if task.status != TaskStatus::Queued {
            return Err(AgenticError::Scheduler(format!(
                "task {} is already {}",
                task.id, task.status
            )));
        }

        let sender = self.sender.lock().clone().ok_or_else(stopped)?;
        let handle = TaskHandle::new(task);
        sender.send(handle.clone()).await.map_err(|_| stopped())?;

        debug!(task_id = %handle.id(), "Task queued");
        Ok(handle)
    }

    /// Build a task from `category` and `payload` and [`schedule`](Self::schedule) it.
    pub async fn submit(
        &self,
        category: impl Into<String>,
        payload: Payload,
    ) -> AgenticResult<TaskHandle> {
        self.schedule(Task::new(category).with_payload(payload)).await
    }

    /// Spawn `workers` worker loops on the current tokio runtime.
    pub fn run(&self, workers: usize) {
        let mut handles = self.workers.lock();
        let first = handles.len();
        for worker_id in first..first + workers {
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                self.receiver.clone(),
                self.registry.clone(),
                self.cancel.clone(),
            )));
        }
        info!(workers, total = handles.len(), "Scheduler workers started");
    }

    /// Signal cancellation, close the queue, and wait for every worker to exit.
    ///
    /// Tasks already executing run to completion; their agents see the
    /// cancellation token fire. Tasks still queued are marked `failed` so none
    /// is silently dropped. Calling `stop` again is a no-op.
    pub async fn stop(&self) {
        info!("Scheduler stopping");
        self.cancel.cancel();
        self.sender.lock().take();
        self.join_workers().await;
        self.abandon_queued().await;
        info!("Scheduler stopped");
    }

    /// Close the queue for new entries, let the workers execute everything
    /// already queued, then stop.
    pub async fn drain(&self) {
        info!("Scheduler draining");
        self.sender.lock().take();
        self.join_workers().await;
        self.cancel.cancel();
        self.abandon_queued().await;
        info!("Scheduler drained");
    }

    /// Whether `stop` or `drain` has been called.
    pub fn is_stopped(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Number of tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.sender
            .lock()
            .as_ref()
            .map(|s| self.capacity - s.capacity())
            .unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    async fn join_workers(&self) {
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Scheduler worker terminated abnormally");
            }
        }
    }

    async fn abandon_queued(&self) {
        fail_queued(&mut *self.receiver.lock().await);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.sender.get_mut().take();
        // Queued handles would otherwise vanish with the channel and their
        // waiters would never wake.
        match self.receiver.try_lock() {
            Ok(mut receiver) => fail_queued(&mut receiver),
            Err(_) => {
                // A worker still holds the receiver; it releases it as soon as
                // it observes the cancellation.
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    let receiver = self.receiver.clone();
                    runtime.spawn(async move { fail_queued(&mut *receiver.lock().await) });
                }
            }
        }
    }
}

/// Close the queue and mark every task still in it `failed`.
fn fail_queued(receiver: &mut mpsc::Receiver<TaskHandle>) {
    receiver.close();
    let mut abandoned = 0usize;
    while let Ok(handle) = receiver.try_recv() {
        let error = AgenticError::Scheduler(
            "scheduler stopped before the task was dispatched".to_string(),
        );
        handle.update(|t| t.fail(TaskResult::failure(error)));
        abandoned += 1;
    }
    if abandoned > 0 {
        warn!(abandoned, "Queued tasks failed at shutdown");
    }
}

fn stopped() -> AgenticError {
    AgenticError::Scheduler("scheduler is stopped".to_string())
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<TaskHandle>>>,
    registry: Arc<AgentRegistry>,
    cancel: CancellationToken,
) {
    debug!(worker = worker_id, "Worker started");
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            handle = async { receiver.lock().await.recv().await } => handle,
        };
        let Some(handle) = next else {
            break;
        };
        handle_task(worker_id, &registry, &handle, &cancel).await;
    }
    debug!(worker = worker_id, "Worker exited");
}

async fn handle_task(
    worker_id: usize,
    registry: &AgentRegistry,
    handle: &TaskHandle,
    cancel: &CancellationToken,
) {
    let category = handle.category();
    let agent = match registry.select(&category) {
        Ok(agent) => agent,
        Err(e) => {
            warn!(task_id = %handle.id(), category = %category, error = %e, "Task failed: no capable agent");
            handle.update(|t| t.fail(TaskResult::failure(&e)));
            return;
        }
    };

    if !handle.update(Task::mark_running) {
        warn!(task_id = %handle.id(), status = %handle.status(), "Task is not queued; skipping");
        return;
    }
    debug!(worker = worker_id, task_id = %handle.id(), agent = %agent.name(), "Executing task");

    // Run on a separate tokio task so a panicking agent cannot take the worker down.
    let task = handle.snapshot();
    let token = cancel.child_token();
    let execution = tokio::spawn(async move { agent.execute(&task, token).await });

    let result = match execution.await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(task_id = %handle.id(), error = %e, "Task execution failed");
            TaskResult::failure(e)
        }
        Err(e) => {
            warn!(task_id = %handle.id(), error = %e, "Task execution panicked");
            TaskResult::failure(AgenticError::Agent(format!("agent panicked: {e}")))
        }
    };

    handle.update(|t| t.complete(result));
    debug!(worker = worker_id, task_id = %handle.id(), status = %handle.status(), "Task finished");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use agentic_core::Agent;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl Agent for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn supports(&self, category: &str) -> bool {
            category == "echo"
        }

        async fn execute(&self, task: &Task, _cancel: CancellationToken) -> AgenticResult<TaskResult> {
            Ok(TaskResult::success(serde_json::Value::Object(task.payload.clone())))
        }
    }

    fn registry() -> Arc<AgentRegistry> {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(Echo));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_schedule_after_stop_fails() {
        let scheduler = Scheduler::new(registry(), 4);
        scheduler.stop().await;
        assert!(scheduler.is_stopped());
        let err = scheduler.schedule(Task::new("echo")).await.unwrap_err();
        assert!(matches!(err, AgenticError::Scheduler(_)));
    }

    #[tokio::test]
    async fn test_rejects_task_that_already_ran() {
        let scheduler = Scheduler::new(registry(), 4);
        let mut task = Task::new("echo");
        task.mark_running();
        assert!(scheduler.schedule(task).await.is_err());
        assert_eq!(scheduler.queued(), 0);
    }

    #[tokio::test]
    async fn test_stop_without_workers_fails_queued_tasks() {
        let scheduler = Scheduler::new(registry(), 4);
        let a = scheduler.schedule(Task::new("echo")).await.unwrap();
        let b = scheduler.schedule(Task::new("echo")).await.unwrap();
        assert_eq!(scheduler.queued(), 2);

        scheduler.stop().await;

        for handle in [a, b] {
            assert_eq!(handle.status(), TaskStatus::Failed);
            assert!(handle.result().unwrap().is_error());
        }
    }

    #[tokio::test]
    async fn test_dropping_scheduler_fails_queued_tasks() {
        let scheduler = Scheduler::new(registry(), 4);
        let handle = scheduler.schedule(Task::new("echo")).await.unwrap();
        drop(scheduler);

        assert_eq!(handle.status(), TaskStatus::Failed);
        let task = tokio::time::timeout(Duration::from_secs(2), handle.wait())
            .await
            .expect("wait returns once the scheduler is gone");
        assert!(task.result.unwrap().is_error());
    }

    #[tokio::test]
    async fn test_dropping_scheduler_while_receiver_is_busy() {
        let scheduler = Scheduler::new(registry(), 4);
        let handle = scheduler.schedule(Task::new("echo")).await.unwrap();
        // Stand in for a worker parked on the queue.
        let receiver = scheduler.receiver.clone();
        let guard = receiver.lock().await;

        drop(scheduler);
        assert_eq!(handle.status(), TaskStatus::Queued);
        drop(guard);

        let task = tokio::time::timeout(Duration::from_secs(2), handle.wait())
            .await
            .expect("queued task reaches a terminal state");
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let scheduler = Scheduler::new(registry(), 0);
        assert_eq!(scheduler.capacity(), 1);
    }

    #[tokio::test]
    async fn test_schedule_blocks_when_full() {
        let scheduler = Scheduler::new(registry(), 1);
        scheduler.schedule(Task::new("echo")).await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), scheduler.schedule(Task::new("echo")))
                .await;
        assert!(blocked.is_err(), "second schedule should wait for capacity");

        scheduler.run(1);
        let handle = tokio::time::timeout(
            Duration::from_secs(5),
            scheduler.schedule(Task::new("echo").with_param("n", 2)),
        )
        .await
        .expect("capacity frees once a worker drains")
        .unwrap();

        let task = handle.wait().await;
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.result.unwrap().output, json!({"n": 2}));
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_handle_debug() {
        let scheduler = Scheduler::new(registry(), 1);
        let handle = scheduler.submit("echo", Payload::new()).await.unwrap();
        let debug = format!("{handle:?}");
        assert!(debug.contains("Queued"));
        scheduler.stop().await;
    }
}
