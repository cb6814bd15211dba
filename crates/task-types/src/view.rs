//! Read-only projections of task state for inspection endpoints.

use serde::{Deserialize, Serialize};

use crate::{
    entry::{TaskEntry, TaskStatus},
    id::{TaskExecutorId, TaskId, Timestamp},
    result::DependencyResult,
    task::{CircuitType, TaskType},
};

/// Flat snapshot of one task at a given observation time.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub task_type: TaskType,
    pub circuit_type: CircuitType,
    pub status: TaskStatus,
    pub owner: TaskExecutorId,
    pub created: Timestamp,
    pub started: Option<Timestamp>,
    pub finished: Option<Timestamp>,
    /// Milliseconds the task has been executing, for running tasks.
    pub execution_time: Option<u64>,
    pub retry_count: u32,
}

impl TaskView {
    pub fn from_entry(entry: &TaskEntry, now: Timestamp) -> Self {
        let execution_time = match entry.status {
            TaskStatus::Running => entry.started.map(|s| s.saturating_elapsed(now)),
            _ => None,
        };
        Self {
            id: entry.id(),
            task_type: entry.task.task_type,
            circuit_type: entry.task.circuit_type,
            status: entry.status,
            owner: entry.owner,
            created: entry.created,
            started: entry.started,
            finished: entry.finished,
            execution_time,
            retry_count: entry.retry_count,
        }
    }
}

/// One node in a task lineage tree.
///
/// Live dependencies are rendered from their stored entries; resolved
/// dependencies survive only as [`DependencyResult`] snapshots on the
/// dependent and render as leaf nodes with no type or owner.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskTreeView {
    pub id: TaskId,
    pub task_type: Option<TaskType>,
    pub status: TaskStatus,
    pub owner: Option<TaskExecutorId>,
    pub error: Option<String>,
    pub dependencies: Vec<TaskTreeView>,
}

impl TaskTreeView {
    /// Node for a live stored entry. The caller fills in `dependencies`.
    pub fn from_entry(entry: &TaskEntry, dependencies: Vec<TaskTreeView>) -> Self {
        Self {
            id: entry.id(),
            task_type: Some(entry.task.task_type),
            status: entry.status,
            owner: (!entry.owner.is_unknown()).then_some(entry.owner),
            error: None,
            dependencies,
        }
    }

    /// Leaf node for a dependency that already resolved.
    pub fn from_dependency_result(result: &DependencyResult) -> Self {
        Self {
            id: result.task_id,
            task_type: None,
            status: if result.success {
                TaskStatus::Completed
            } else {
                TaskStatus::Failed
            },
            owner: None,
            error: result.error.clone(),
            dependencies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        id::{BlockHash, BlockRef, ShardId},
        task::Task,
    };

    fn entry() -> TaskEntry {
        let task = Task::new(
            TaskId::random(),
            None,
            None,
            BlockRef::new(ShardId(1), 42, BlockHash::new([7; 32])),
            TaskType::ProofBlock,
            CircuitType::Zkevm,
        );
        TaskEntry::new(task, Timestamp::from_millis(1_000))
    }

    #[test]
    fn test_view_of_ready_entry_has_no_execution_time() {
        let e = entry();
        let view = TaskView::from_entry(&e, Timestamp::from_millis(5_000));
        assert_eq!(view.status, TaskStatus::WaitingForExecutor);
        assert_eq!(view.execution_time, None);
    }

    #[test]
    fn test_view_of_running_entry_measures_elapsed() {
        let mut e = entry();
        e.start(TaskExecutorId(3), Timestamp::from_millis(2_000))
            .unwrap();

        let view = TaskView::from_entry(&e, Timestamp::from_millis(5_000));
        assert_eq!(view.execution_time, Some(3_000));
        assert_eq!(view.owner, TaskExecutorId(3));
    }

    #[test]
    fn test_tree_leaf_from_failed_dependency() {
        let dep = DependencyResult {
            task_id: TaskId::random(),
            success: false,
            data: Vec::new(),
            error: Some("boom".to_string()),
        };
        let node = TaskTreeView::from_dependency_result(&dep);
        assert_eq!(node.status, TaskStatus::Failed);
        assert_eq!(node.error.as_deref(), Some("boom"));
        assert!(node.dependencies.is_empty());
        assert!(node.task_type.is_none());
    }

    #[test]
    fn test_views_serialize_to_json() {
        let e = entry();
        let view = TaskView::from_entry(&e, Timestamp::from_millis(2_000));
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("WaitingForExecutor"));
    }
}
