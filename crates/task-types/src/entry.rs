//! Persistent task record and its state machine.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    errors::TaskError,
    id::{TaskExecutorId, TaskId, Timestamp},
    result::{DependencyResult, TaskOutcome, TaskResult},
    set::TaskIdSet,
    task::Task,
};

/// Scheduling state of a task.
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
pub enum TaskStatus {
    /// Has unresolved dependencies.
    WaitingForInput,
    /// Ready to be handed to an executor.
    WaitingForExecutor,
    /// Claimed by an executor.
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// A task plus all of its mutable scheduling state.
///
/// Entries are mutated only through the transition methods below, and in
/// production only inside the storage engine's transactions. Dependency
/// edges are kept as mirror images: if B is in A's pending set then A is
/// in B's dependents set.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TaskEntry {
    pub task: Task,
    /// Tasks waiting on this one (reverse edges).
    pub dependents: TaskIdSet,
    /// Tasks this one is still waiting on (unresolved forward edges).
    pub pending_dependencies: TaskIdSet,
    pub created: Timestamp,
    pub started: Option<Timestamp>,
    pub finished: Option<Timestamp>,
    /// Current executor, `UNKNOWN` when unassigned.
    pub owner: TaskExecutorId,
    pub status: TaskStatus,
    /// Times this task was returned to the pool after a failure or
    /// timeout.
    pub retry_count: u32,
    /// Executor whose critical failure cancelled this task, if any.
    pub cancelled_by: Option<TaskExecutorId>,
}

impl TaskEntry {
    /// Creates a ready entry with no dependencies.
    pub fn new(task: Task, created: Timestamp) -> Self {
        Self {
            task,
            dependents: TaskIdSet::new(),
            pending_dependencies: TaskIdSet::new(),
            created,
            started: None,
            finished: None,
            owner: TaskExecutorId::UNKNOWN,
            status: TaskStatus::WaitingForExecutor,
            retry_count: 0,
            cancelled_by: None,
        }
    }

    /// Creates an entry whose output the given parent waits on.
    ///
    /// The parent gains a pending dependency on the new entry and drops
    /// back to `WaitingForInput` until the child resolves.
    pub fn new_child_of(parent: &mut TaskEntry, mut task: Task, created: Timestamp) -> Self {
        task.parent_task_id = Some(parent.task.id);
        let mut child = Self::new(task, created);
        parent.add_dependency(&mut child);
        child
    }

    pub fn id(&self) -> TaskId {
        self.task.id
    }

    /// Wires `dependency` as an unresolved input of this entry.
    ///
    /// Both sides of the edge are updated and this entry stops being
    /// eligible to run until the dependency resolves.
    pub fn add_dependency(&mut self, dependency: &mut TaskEntry) {
        self.pending_dependencies.insert(dependency.id());
        dependency.dependents.insert(self.id());
        self.status = TaskStatus::WaitingForInput;
    }

    /// Assigns the entry to an executor.
    pub fn start(&mut self, executor: TaskExecutorId, now: Timestamp) -> Result<(), TaskError> {
        if executor.is_unknown() {
            return Err(TaskError::InvalidExecutorId);
        }
        if self.status != TaskStatus::WaitingForExecutor {
            return Err(TaskError::InvalidStatus {
                expected: TaskStatus::WaitingForExecutor,
                actual: self.status,
            });
        }

        self.owner = executor;
        self.started = Some(now);
        self.status = TaskStatus::Running;

        debug_assert!(self.pending_dependencies.is_empty());
        Ok(())
    }

    /// Returns a running entry to the ready pool, e.g. after a timeout
    /// or a retryable failure.
    pub fn reset_running(&mut self) -> Result<(), TaskError> {
        if self.status != TaskStatus::Running {
            return Err(TaskError::InvalidStatus {
                expected: TaskStatus::Running,
                actual: self.status,
            });
        }

        self.owner = TaskExecutorId::UNKNOWN;
        self.started = None;
        self.retry_count += 1;
        self.status = TaskStatus::WaitingForExecutor;
        Ok(())
    }

    /// Applies a final result reported by the owning executor.
    ///
    /// The result must name this task and come from the recorded owner;
    /// stale reports from superseded executors are rejected with
    /// [`TaskError::WrongExecutor`].
    pub fn terminate(&mut self, result: &TaskResult, now: Timestamp) -> Result<(), TaskError> {
        if result.task_id != self.id() {
            return Err(TaskError::ResultNotApplicable {
                expected: result.task_id,
                actual: self.id(),
            });
        }
        if self.status != TaskStatus::Running {
            return Err(TaskError::InvalidStatus {
                expected: TaskStatus::Running,
                actual: self.status,
            });
        }
        if result.sender != self.owner {
            return Err(TaskError::WrongExecutor {
                expected: self.owner,
                actual: result.sender,
            });
        }

        self.status = match &result.outcome {
            TaskOutcome::Success { .. } => TaskStatus::Completed,
            TaskOutcome::Cancelled => TaskStatus::Cancelled,
            TaskOutcome::Failure(_) => TaskStatus::Failed,
        };
        self.finished = Some(now);
        Ok(())
    }

    /// Cancels the entry as part of a cascade.
    ///
    /// Valid from any non-terminal state; returns false if the entry is
    /// already terminal and was left untouched.
    pub fn cancel(&mut self, initiator: TaskExecutorId, now: Timestamp) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = TaskStatus::Cancelled;
        self.owner = TaskExecutorId::UNKNOWN;
        self.cancelled_by = Some(initiator);
        self.finished = Some(now);
        true
    }

    /// Records the outcome of a dependency this entry is waiting on.
    ///
    /// A successful dependency is removed from the pending set, and the
    /// entry becomes ready once the set drains. A failed dependency is
    /// recorded but stays pending: such an entry never becomes ready on
    /// its own and is only resolved by cascade cancellation.
    pub fn add_dependency_result(&mut self, result: DependencyResult) -> Result<(), TaskError> {
        if !self.pending_dependencies.contains(&result.task_id) {
            return Err(TaskError::UnknownDependency(result.task_id));
        }

        let success = result.success;
        let dep_id = result.task_id;
        self.task.dependency_results.insert(dep_id, result);

        if success {
            self.pending_dependencies.remove(&dep_id);
            if self.pending_dependencies.is_empty() && self.status == TaskStatus::WaitingForInput {
                self.status = TaskStatus::WaitingForExecutor;
            }
        }
        Ok(())
    }

    /// Whether this entry should be dispatched before `other`.
    ///
    /// Non-aggregation work always beats `AggregateProofs`, so final
    /// aggregation waits for as much upstream output as possible. Within
    /// a class, earlier creation wins, then the task type ordinal, then
    /// the id bytes. The order is total, so selection is deterministic.
    /// No candidate (`None`) always loses.
    pub fn has_higher_priority_than(&self, other: Option<&TaskEntry>) -> bool {
        let Some(other) = other else {
            return true;
        };

        let self_agg = self.task.task_type.is_aggregation();
        let other_agg = other.task.task_type.is_aggregation();
        if self_agg != other_agg {
            return !self_agg;
        }

        if self.created != other.created {
            return self.created < other.created;
        }
        if self.task.task_type != other.task.task_type {
            return self.task.task_type.ordinal() < other.task.task_type.ordinal();
        }
        self.id() < other.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        id::{BlockHash, BlockRef, ShardId},
        result::TaskExecError,
        task::{CircuitType, TaskType},
    };

    fn block_ref(number: u64) -> BlockRef {
        BlockRef::new(ShardId(0), number, BlockHash::new([0; 32]))
    }

    fn entry(task_type: TaskType, created: u64) -> TaskEntry {
        let task = Task::new(
            TaskId::random(),
            None,
            None,
            block_ref(1),
            task_type,
            CircuitType::None,
        );
        TaskEntry::new(task, Timestamp::from_millis(created))
    }

    #[test]
    fn test_new_entry_is_ready() {
        let e = entry(TaskType::ProofBlock, 100);
        assert_eq!(e.status, TaskStatus::WaitingForExecutor);
        assert!(e.pending_dependencies.is_empty());
        assert!(e.owner.is_unknown());
    }

    #[test]
    fn test_start_happy_path() {
        let mut e = entry(TaskType::ProofBlock, 100);
        e.start(TaskExecutorId(5), Timestamp::from_millis(200))
            .unwrap();

        assert_eq!(e.status, TaskStatus::Running);
        assert_eq!(e.owner, TaskExecutorId(5));
        assert_eq!(e.started, Some(Timestamp::from_millis(200)));
    }

    #[test]
    fn test_start_rejects_unknown_executor() {
        let mut e = entry(TaskType::ProofBlock, 100);
        let err = e
            .start(TaskExecutorId::UNKNOWN, Timestamp::from_millis(200))
            .unwrap_err();
        assert_eq!(err, TaskError::InvalidExecutorId);
    }

    #[test]
    fn test_start_rejects_non_ready() {
        let mut e = entry(TaskType::ProofBlock, 100);
        e.start(TaskExecutorId(5), Timestamp::from_millis(200))
            .unwrap();

        let err = e
            .start(TaskExecutorId(6), Timestamp::from_millis(300))
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::InvalidStatus {
                expected: TaskStatus::WaitingForExecutor,
                actual: TaskStatus::Running,
            }
        ));
    }

    #[test]
    fn test_reset_running_returns_to_pool() {
        let mut e = entry(TaskType::ProofBlock, 100);
        e.start(TaskExecutorId(5), Timestamp::from_millis(200))
            .unwrap();
        e.reset_running().unwrap();

        assert_eq!(e.status, TaskStatus::WaitingForExecutor);
        assert!(e.owner.is_unknown());
        assert_eq!(e.started, None);
        assert_eq!(e.retry_count, 1);
    }

    #[test]
    fn test_reset_running_requires_running() {
        let mut e = entry(TaskType::ProofBlock, 100);
        assert!(e.reset_running().is_err());
    }

    #[test]
    fn test_terminate_success() {
        let mut e = entry(TaskType::ProofBlock, 100);
        e.start(TaskExecutorId(5), Timestamp::from_millis(200))
            .unwrap();

        let result = TaskResult::success(e.id(), TaskExecutorId(5), vec![1]);
        e.terminate(&result, Timestamp::from_millis(300)).unwrap();

        assert_eq!(e.status, TaskStatus::Completed);
        assert_eq!(e.finished, Some(Timestamp::from_millis(300)));
    }

    #[test]
    fn test_terminate_rejects_wrong_executor() {
        let mut e = entry(TaskType::ProofBlock, 100);
        e.start(TaskExecutorId(5), Timestamp::from_millis(200))
            .unwrap();

        let result = TaskResult::success(e.id(), TaskExecutorId(6), vec![]);
        let err = e
            .terminate(&result, Timestamp::from_millis(300))
            .unwrap_err();
        assert!(matches!(err, TaskError::WrongExecutor { .. }));
    }

    #[test]
    fn test_terminate_rejects_mismatched_task_id() {
        let mut e = entry(TaskType::ProofBlock, 100);
        e.start(TaskExecutorId(5), Timestamp::from_millis(200))
            .unwrap();

        let result = TaskResult::success(TaskId::random(), TaskExecutorId(5), vec![]);
        let err = e
            .terminate(&result, Timestamp::from_millis(300))
            .unwrap_err();
        assert!(matches!(err, TaskError::ResultNotApplicable { .. }));
    }

    #[test]
    fn test_terminate_failure_maps_to_failed() {
        let mut e = entry(TaskType::ProofBlock, 100);
        e.start(TaskExecutorId(5), Timestamp::from_millis(200))
            .unwrap();

        let result = TaskResult::failure(e.id(), TaskExecutorId(5), TaskExecError::failed("nope"));
        e.terminate(&result, Timestamp::from_millis(300)).unwrap();
        assert_eq!(e.status, TaskStatus::Failed);
    }

    #[test]
    fn test_cancel_from_any_non_terminal_state() {
        let mut ready = entry(TaskType::ProofBlock, 100);
        assert!(ready.cancel(TaskExecutorId(9), Timestamp::from_millis(150)));
        assert_eq!(ready.status, TaskStatus::Cancelled);
        assert_eq!(ready.cancelled_by, Some(TaskExecutorId(9)));
        assert!(ready.owner.is_unknown());

        let mut running = entry(TaskType::ProofBlock, 100);
        running
            .start(TaskExecutorId(5), Timestamp::from_millis(200))
            .unwrap();
        assert!(running.cancel(TaskExecutorId(9), Timestamp::from_millis(250)));
        assert!(running.owner.is_unknown());

        // Already terminal: untouched.
        assert!(!running.cancel(TaskExecutorId(2), Timestamp::from_millis(260)));
        assert_eq!(running.cancelled_by, Some(TaskExecutorId(9)));
    }

    #[test]
    fn test_dependency_wiring_is_mirrored() {
        let mut parent = entry(TaskType::MergeProof, 100);
        let mut child = entry(TaskType::ProofBlock, 100);

        parent.add_dependency(&mut child);

        assert_eq!(parent.status, TaskStatus::WaitingForInput);
        assert!(parent.pending_dependencies.contains(&child.id()));
        assert!(child.dependents.contains(&parent.id()));
    }

    #[test]
    fn test_new_child_of_sets_parent_link() {
        let mut parent = entry(TaskType::MergeProof, 100);
        let task = Task::new(
            TaskId::random(),
            None,
            None,
            block_ref(2),
            TaskType::ProofBlock,
            CircuitType::Zkevm,
        );
        let child = TaskEntry::new_child_of(&mut parent, task, Timestamp::from_millis(110));

        assert_eq!(child.task.parent_task_id, Some(parent.id()));
        assert!(parent.pending_dependencies.contains(&child.id()));
        assert_eq!(parent.status, TaskStatus::WaitingForInput);
    }

    #[test]
    fn test_successful_dependency_unblocks() {
        let mut parent = entry(TaskType::MergeProof, 100);
        let mut dep_a = entry(TaskType::ProofBlock, 100);
        let mut dep_b = entry(TaskType::ProofBlock, 100);
        parent.add_dependency(&mut dep_a);
        parent.add_dependency(&mut dep_b);

        let result_a = TaskResult::success(dep_a.id(), TaskExecutorId(1), vec![0xaa]);
        parent
            .add_dependency_result(DependencyResult::from(&result_a))
            .unwrap();
        assert_eq!(parent.status, TaskStatus::WaitingForInput);

        let result_b = TaskResult::success(dep_b.id(), TaskExecutorId(2), vec![0xbb]);
        parent
            .add_dependency_result(DependencyResult::from(&result_b))
            .unwrap();

        assert_eq!(parent.status, TaskStatus::WaitingForExecutor);
        assert!(parent.pending_dependencies.is_empty());
        assert_eq!(parent.task.dependency_results.len(), 2);
    }

    #[test]
    fn test_failed_dependency_stays_pending() {
        let mut parent = entry(TaskType::MergeProof, 100);
        let mut dep = entry(TaskType::ProofBlock, 100);
        parent.add_dependency(&mut dep);

        let result = TaskResult::failure(dep.id(), TaskExecutorId(1), TaskExecError::failed("x"));
        parent
            .add_dependency_result(DependencyResult::from(&result))
            .unwrap();

        // Recorded, but the entry never becomes ready on its own.
        assert_eq!(parent.status, TaskStatus::WaitingForInput);
        assert!(parent.pending_dependencies.contains(&dep.id()));
        assert!(parent.task.dependency_results.contains_key(&dep.id()));
    }

    #[test]
    fn test_unknown_dependency_result_rejected() {
        let mut e = entry(TaskType::MergeProof, 100);
        let stray = TaskResult::success(TaskId::random(), TaskExecutorId(1), vec![]);
        let err = e
            .add_dependency_result(DependencyResult::from(&stray))
            .unwrap_err();
        assert!(matches!(err, TaskError::UnknownDependency(_)));
    }

    #[test]
    fn test_priority_none_always_loses() {
        let e = entry(TaskType::AggregateProofs, 100);
        assert!(e.has_higher_priority_than(None));
    }

    #[test]
    fn test_priority_non_aggregation_beats_aggregation() {
        let agg = entry(TaskType::AggregateProofs, 50);
        let step = entry(TaskType::FriConsistencyCheck, 900);

        // Even a much newer step task beats a ready aggregation task.
        assert!(step.has_higher_priority_than(Some(&agg)));
        assert!(!agg.has_higher_priority_than(Some(&step)));
    }

    #[test]
    fn test_priority_fifo_then_type_ordinal() {
        let older = entry(TaskType::CombinedQ, 100);
        let newer = entry(TaskType::ProofBlock, 200);
        assert!(older.has_higher_priority_than(Some(&newer)));
        assert!(!newer.has_higher_priority_than(Some(&older)));

        let proof = entry(TaskType::ProofBlock, 100);
        let merge = entry(TaskType::MergeProof, 100);
        assert!(proof.has_higher_priority_than(Some(&merge)));
        assert!(!merge.has_higher_priority_than(Some(&proof)));
    }

    #[test]
    fn test_priority_is_total_on_equal_fields() {
        let a = entry(TaskType::ProofBlock, 100);
        let b = entry(TaskType::ProofBlock, 100);

        // Exactly one direction wins, decided by the id bytes.
        assert_ne!(
            a.has_higher_priority_than(Some(&b)),
            b.has_higher_priority_than(Some(&a))
        );
    }
}
