//! Contracts between the storage engine and its collaborators.

use std::{fmt::Debug, time::Duration};

use strata_task_types::{
    Task, TaskEntry, TaskExecutorId, TaskId, TaskResult, TaskStatus, TaskTreeView, TaskType,
    TaskView, Timestamp,
};

use crate::errors::DbResult;

/// Time source injected into the storage engine so timeout behavior is
/// testable.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Counters fired by the storage engine.
///
/// Hooks are invoked only after the surrounding transaction has
/// committed, never inside it, so an aborted transaction leaves no
/// trace in the metrics.
pub trait TaskMetrics: Debug + Send + Sync {
    fn record_task_added(&self, task_type: TaskType);
    fn record_task_started(&self, task_type: TaskType);
    fn record_task_terminated(&self, task_type: TaskType, status: TaskStatus);
    fn record_task_rescheduled(&self, task_type: TaskType, previous_executor: TaskExecutorId);
}

/// Metrics sink that drops everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopTaskMetrics;

impl TaskMetrics for NoopTaskMetrics {
    fn record_task_added(&self, _task_type: TaskType) {}
    fn record_task_started(&self, _task_type: TaskType) {}
    fn record_task_terminated(&self, _task_type: TaskType, _status: TaskStatus) {}
    fn record_task_rescheduled(&self, _task_type: TaskType, _previous_executor: TaskExecutorId) {}
}

/// Persistent task scheduler storage.
///
/// Every operation executes as a single atomic transaction against the
/// backing store (or is internally retried as a unit), so concurrent
/// callers observe serializable behavior.
pub trait TaskDatabase: Send + Sync {
    /// Inserts a batch of new entries; all or nothing. Fails with
    /// [`crate::DbError::TaskAlreadyExists`] on an id collision.
    fn add_task_entries(&self, entries: &[TaskEntry]) -> DbResult<()>;

    /// Point lookup; an absent id is not an error.
    fn try_get_task_entry(&self, id: &TaskId) -> DbResult<Option<TaskEntry>>;

    /// Snapshot of all entries matching the predicate, projected at the
    /// current time.
    fn get_task_views(&self, predicate: &dyn Fn(&TaskView) -> bool) -> DbResult<Vec<TaskView>>;

    /// Reconstructs the dependency tree below the given root, or `None`
    /// if the root is not stored.
    fn get_task_tree_view(&self, root: &TaskId) -> DbResult<Option<TaskTreeView>>;

    /// Atomically selects the highest-priority ready task, assigns it
    /// to the executor, and returns its payload. `None` when nothing is
    /// ready.
    fn request_task_to_execute(&self, executor: TaskExecutorId) -> DbResult<Option<Task>>;

    /// Applies an executor's result: terminates or reschedules the
    /// task, propagates the outcome to dependents, and cascades
    /// cancellation on critical failures. A result for an unknown task
    /// is ignored.
    fn process_task_result(&self, result: &TaskResult) -> DbResult<()>;

    /// Returns every task running longer than `timeout` to the ready
    /// pool and reports which (type, previous executor) pairs were
    /// affected.
    fn reschedule_hanging_tasks(
        &self,
        timeout: Duration,
    ) -> DbResult<Vec<(TaskType, TaskExecutorId)>>;
}
