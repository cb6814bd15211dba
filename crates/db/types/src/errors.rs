//! Database error taxonomy.

use strata_task_types::{TaskError, TaskId};
use thiserror::Error;

/// Errors surfaced by task database operations.
///
/// Domain errors (`TaskNotFound`, `TaskAlreadyExists`, `Task`) and codec
/// failures are deterministic, so retrying the operation is pointless;
/// storage faults are transient.
#[derive(Clone, Debug, Error)]
pub enum DbError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("task already exists: {0}")]
    TaskAlreadyExists(TaskId),

    /// A lineage traversal exceeded the depth limit. Also catches
    /// dependency cycles, which would otherwise loop forever.
    #[error("task tree too deep from root {root} (limit {limit})")]
    TreeDepthExceeded { root: TaskId, limit: usize },

    /// A rejected state transition from the model layer.
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("codec error: {0}")]
    CodecError(String),

    /// Storage-level transaction failure.
    #[error("transaction error: {0}")]
    TransactionError(String),

    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Whether retrying the failed operation could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::TransactionError(_) | DbError::Other(_))
    }
}

impl From<typed_sled::error::Error> for DbError {
    fn from(err: typed_sled::error::Error) -> Self {
        match err {
            typed_sled::error::Error::CodecError(e) => DbError::CodecError(e.to_string()),
            other => DbError::TransactionError(other.to_string()),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
