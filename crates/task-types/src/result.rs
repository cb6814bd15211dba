//! Results reported by executors and the dependency snapshots derived
//! from them.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::id::{TaskExecutorId, TaskId};

/// Classification of an execution failure.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum TaskErrorKind {
    /// The task will fail the same way again; do not retry.
    NonRetryable,
    /// Transient fault; the task goes back to the ready queue.
    Retryable,
    /// The executor stopped reporting and the sweep timed the task out.
    Timeout,
    /// The whole lineage is poisoned; triggers cascade cancellation.
    Critical,
}

impl TaskErrorKind {
    pub const fn is_retryable(&self) -> bool {
        matches!(self, TaskErrorKind::Retryable | TaskErrorKind::Timeout)
    }
}

/// An execution failure with its classification.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TaskExecError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskExecError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Retryable, message)
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Critical, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Timeout, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::NonRetryable, message)
    }

    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Final disposition of one execution attempt.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// Proof bytes produced by the executor.
    Success { data: Vec<u8> },
    Failure(TaskExecError),
    Cancelled,
}

impl TaskOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success { .. })
    }
}

/// A completed attempt as reported back by an executor.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    /// The executor reporting the result. Must match the recorded owner.
    pub sender: TaskExecutorId,
    pub outcome: TaskOutcome,
}

impl TaskResult {
    pub fn success(task_id: TaskId, sender: TaskExecutorId, data: Vec<u8>) -> Self {
        Self {
            task_id,
            sender,
            outcome: TaskOutcome::Success { data },
        }
    }

    pub fn failure(task_id: TaskId, sender: TaskExecutorId, error: TaskExecError) -> Self {
        Self {
            task_id,
            sender,
            outcome: TaskOutcome::Failure(error),
        }
    }

    pub fn cancelled(task_id: TaskId, sender: TaskExecutorId) -> Self {
        Self {
            task_id,
            sender,
            outcome: TaskOutcome::Cancelled,
        }
    }

    /// Result synthesized by the reschedule sweep for a task whose
    /// executor went silent. The sender is the stale owner.
    pub fn new_timeout(task_id: TaskId, sender: TaskExecutorId) -> Self {
        Self::failure(
            task_id,
            sender,
            TaskExecError::timeout("execution timed out"),
        )
    }
}

/// Snapshot of a finished dependency, recorded on each dependent task.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DependencyResult {
    pub task_id: TaskId,
    pub success: bool,
    /// Proof bytes when successful.
    pub data: Vec<u8>,
    /// Failure description otherwise.
    pub error: Option<String>,
}

impl From<&TaskResult> for DependencyResult {
    fn from(result: &TaskResult) -> Self {
        match &result.outcome {
            TaskOutcome::Success { data } => Self {
                task_id: result.task_id,
                success: true,
                data: data.clone(),
                error: None,
            },
            TaskOutcome::Failure(err) => Self {
                task_id: result.task_id,
                success: false,
                data: Vec::new(),
                error: Some(err.message.clone()),
            },
            TaskOutcome::Cancelled => Self {
                task_id: result.task_id,
                success: false,
                data: Vec::new(),
                error: Some("cancelled".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(TaskErrorKind::Retryable.is_retryable());
        assert!(TaskErrorKind::Timeout.is_retryable());
        assert!(!TaskErrorKind::NonRetryable.is_retryable());
        assert!(!TaskErrorKind::Critical.is_retryable());
    }

    #[test]
    fn test_dependency_result_from_success() {
        let id = TaskId::random();
        let result = TaskResult::success(id, TaskExecutorId(3), vec![1, 2, 3]);

        let dep = DependencyResult::from(&result);
        assert!(dep.success);
        assert_eq!(dep.task_id, id);
        assert_eq!(dep.data, vec![1, 2, 3]);
        assert!(dep.error.is_none());
    }

    #[test]
    fn test_dependency_result_from_failure() {
        let id = TaskId::random();
        let result = TaskResult::failure(id, TaskExecutorId(3), TaskExecError::critical("bad"));

        let dep = DependencyResult::from(&result);
        assert!(!dep.success);
        assert!(dep.data.is_empty());
        assert_eq!(dep.error.as_deref(), Some("bad"));
    }

    #[test]
    fn test_timeout_result_is_retryable_failure() {
        let result = TaskResult::new_timeout(TaskId::random(), TaskExecutorId(9));
        match result.outcome {
            TaskOutcome::Failure(err) => {
                assert_eq!(err.kind, TaskErrorKind::Timeout);
                assert!(err.is_retryable());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
