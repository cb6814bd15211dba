//! Errors raised by task state transitions.

use thiserror::Error;

use crate::{
    entry::TaskStatus,
    id::{TaskExecutorId, TaskId},
};

/// A rejected state transition or result application.
///
/// These are domain errors: the caller violated the lifecycle contract
/// and retrying the same call will fail the same way.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TaskError {
    /// The unknown-executor sentinel cannot claim or report tasks.
    #[error("invalid executor id")]
    InvalidExecutorId,

    /// The entry was not in the status the transition requires.
    #[error("invalid task status: expected {expected:?}, got {actual:?}")]
    InvalidStatus {
        expected: TaskStatus,
        actual: TaskStatus,
    },

    /// A result arrived from an executor that does not own the task.
    #[error("wrong executor: task owned by {expected}, result from {actual}")]
    WrongExecutor {
        expected: TaskExecutorId,
        actual: TaskExecutorId,
    },

    /// A dependency result arrived for a task that never depended on it.
    #[error("unknown dependency: {0}")]
    UnknownDependency(TaskId),

    /// A result was applied to a different task than it names.
    #[error("result not applicable: for task {expected}, applied to {actual}")]
    ResultNotApplicable { expected: TaskId, actual: TaskId },
}
