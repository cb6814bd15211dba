//! Transactional task database over sled.

use std::{
    collections::{BTreeSet, HashMap, HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use strata_task_types::{
    BatchId, DependencyResult, Task, TaskEntry, TaskError, TaskErrorKind, TaskExecutorId, TaskId,
    TaskOutcome, TaskResult, TaskStatus, TaskTreeView, TaskType, TaskView, Timestamp,
};
use strata_taskdb_types::{
    Clock, DbError, DbResult, NoopTaskMetrics, SystemClock, TaskDatabase, TaskMetrics,
};
use tracing::{debug, warn};
use typed_sled::{SledDb, SledTree, tree::SledTransactionalTree};

use super::schemas::{TaskBatchIndexSchema, TaskEntrySchema};
use crate::{
    config::SledDbConfig,
    utils::{abort_with, tx_op_error},
};

/// Traversal depth limit for lineage queries. Deep enough for any real
/// pipeline; exceeding it means a corrupt or cyclic dependency graph.
const MAX_TREE_DEPTH: usize = 64;

/// Upper bound on tasks returned to the pool by a single sweep, so one
/// call cannot stall on an unbounded backlog.
const MAX_RESCHEDULES_PER_CALL: usize = 100;

/// Outcome of applying an executor result, carried out of the
/// transaction so metrics fire only after commit.
enum ProcessOutcome {
    Missing,
    Rescheduled(TaskType),
    Terminated(TaskType, TaskStatus),
}

/// Sled-backed implementation of [`TaskDatabase`].
#[derive(Debug)]
pub struct TaskDBSled {
    task_tree: SledTree<TaskEntrySchema>,
    batch_idx_tree: SledTree<TaskBatchIndexSchema>,
    config: SledDbConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn TaskMetrics>,
}

impl TaskDBSled {
    pub fn new(db: Arc<SledDb>, config: SledDbConfig) -> DbResult<Self> {
        Self::with_hooks(
            db,
            config,
            Arc::new(SystemClock),
            Arc::new(NoopTaskMetrics),
        )
    }

    /// Constructor with an injected clock and metrics sink, used by the
    /// scheduler wiring and by timeout tests.
    pub fn with_hooks(
        db: Arc<SledDb>,
        config: SledDbConfig,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn TaskMetrics>,
    ) -> DbResult<Self> {
        Ok(Self {
            task_tree: db.get_tree()?,
            batch_idx_tree: db.get_tree()?,
            config,
            clock,
            metrics,
        })
    }

    /// Scans for the highest-priority ready entry, skipping ids already
    /// lost to a concurrent claimant.
    fn find_best_ready(&self, skip: &HashSet<TaskId>) -> DbResult<Option<TaskEntry>> {
        let mut best: Option<TaskEntry> = None;
        for res in self.task_tree.iter() {
            let (_, entry) = res?;
            if entry.status != TaskStatus::WaitingForExecutor || skip.contains(&entry.id()) {
                continue;
            }
            if entry.has_higher_priority_than(best.as_ref()) {
                best = Some(entry);
            }
        }
        Ok(best)
    }
}

/// A result can only reschedule or terminate a task that is running and
/// owned by the reporting executor; anything else is a stale report.
fn check_report_applies(
    entry: &TaskEntry,
    result: &TaskResult,
) -> Result<(), sled::transaction::ConflictableTransactionError<DbError>> {
    if entry.status != TaskStatus::Running {
        return Err(abort_with(TaskError::InvalidStatus {
            expected: TaskStatus::Running,
            actual: entry.status,
        }));
    }
    if entry.owner != result.sender {
        return Err(abort_with(TaskError::WrongExecutor {
            expected: entry.owner,
            actual: result.sender,
        }));
    }
    Ok(())
}

/// Cancels every task in batches downstream of `start`, breadth first
/// over the batch index. Tasks of `start` itself are indexed under its
/// parent and are never visited.
fn cancel_next_batches_tasks(
    tt: &SledTransactionalTree<TaskEntrySchema>,
    bt: &SledTransactionalTree<TaskBatchIndexSchema>,
    start: BatchId,
    initiator: TaskExecutorId,
    now: Timestamp,
) -> Result<u64, sled::transaction::ConflictableTransactionError<DbError>> {
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut cancelled = 0u64;

    while let Some(batch) = queue.pop_front() {
        let Some(ids) = bt.get(&batch).map_err(tx_op_error)? else {
            continue;
        };
        for id in ids.iter() {
            let Some(mut entry) = tt.get(id).map_err(tx_op_error)? else {
                continue;
            };
            // Descendants of this task's own batch are still reachable
            // even if the task itself is already terminal.
            if let Some(child_batch) = entry.task.batch_id
                && visited.insert(child_batch)
            {
                queue.push_back(child_batch);
            }
            if entry.cancel(initiator, now) {
                tt.insert(id, &entry).map_err(tx_op_error)?;
                cancelled += 1;
            }
        }
    }
    Ok(cancelled)
}

impl TaskDatabase for TaskDBSled {
    fn add_task_entries(&self, entries: &[TaskEntry]) -> DbResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        self.config
            .with_retry((&self.task_tree, &self.batch_idx_tree), |(tt, bt)| {
                for entry in entries {
                    let id = entry.id();
                    if tt.get(&id).map_err(tx_op_error)?.is_some() {
                        return Err(abort_with(DbError::TaskAlreadyExists(id)));
                    }
                    tt.insert(&id, entry).map_err(tx_op_error)?;

                    if let Some(parent_batch) = entry.task.parent_batch_id {
                        let mut set = bt.get(&parent_batch).map_err(tx_op_error)?.unwrap_or_default();
                        set.insert(id);
                        bt.insert(&parent_batch, &set).map_err(tx_op_error)?;
                    }
                }
                Ok(())
            })?;

        for entry in entries {
            self.metrics.record_task_added(entry.task.task_type);
        }
        debug!(count = entries.len(), "added task entries");
        Ok(())
    }

    fn try_get_task_entry(&self, id: &TaskId) -> DbResult<Option<TaskEntry>> {
        Ok(self.task_tree.get(id)?)
    }

    fn get_task_views(&self, predicate: &dyn Fn(&TaskView) -> bool) -> DbResult<Vec<TaskView>> {
        let now = self.clock.now();
        let mut views = Vec::new();
        for res in self.task_tree.iter() {
            let (_, entry) = res?;
            let view = TaskView::from_entry(&entry, now);
            if predicate(&view) {
                views.push(view);
            }
        }
        Ok(views)
    }

    fn get_task_tree_view(&self, root: &TaskId) -> DbResult<Option<TaskTreeView>> {
        let Some(root_entry) = self.task_tree.get(root)? else {
            return Ok(None);
        };

        // Iterative two-phase traversal: Enter loads an entry and
        // schedules its unresolved dependencies, Exit assembles the node
        // once they are all built.
        enum Frame {
            Enter(TaskId, usize),
            Exit(TaskId),
        }

        let mut entries: HashMap<TaskId, TaskEntry> = HashMap::from([(*root, root_entry)]);
        let mut memo: HashMap<TaskId, TaskTreeView> = HashMap::new();
        let mut stack = vec![Frame::Enter(*root, 0)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id, depth) => {
                    if depth > MAX_TREE_DEPTH {
                        return Err(DbError::TreeDepthExceeded {
                            root: *root,
                            limit: MAX_TREE_DEPTH,
                        });
                    }
                    if memo.contains_key(&id) {
                        continue;
                    }
                    if !entries.contains_key(&id) {
                        match self.task_tree.get(&id)? {
                            Some(e) => {
                                entries.insert(id, e);
                            }
                            // A pending dependency must be stored; a
                            // dangling edge means the graph is corrupt.
                            None => return Err(DbError::TaskNotFound(id)),
                        }
                    }
                    stack.push(Frame::Exit(id));

                    let entry = &entries[&id];
                    for dep in entry.pending_dependencies.iter() {
                        if !entry.task.dependency_results.contains_key(dep) {
                            stack.push(Frame::Enter(*dep, depth + 1));
                        }
                    }
                }
                Frame::Exit(id) => {
                    let entry = &entries[&id];

                    let mut dep_ids: BTreeSet<TaskId> =
                        entry.pending_dependencies.iter().copied().collect();
                    dep_ids.extend(entry.task.dependency_results.keys().copied());

                    let mut children = Vec::with_capacity(dep_ids.len());
                    for dep in dep_ids {
                        if let Some(dep_result) = entry.task.dependency_results.get(&dep) {
                            children.push(TaskTreeView::from_dependency_result(dep_result));
                        } else {
                            let child = memo.get(&dep).cloned().ok_or_else(|| {
                                DbError::Other(format!("traversal missed dependency {dep}"))
                            })?;
                            children.push(child);
                        }
                    }
                    memo.insert(id, TaskTreeView::from_entry(entry, children));
                }
            }
        }

        Ok(memo.remove(root))
    }

    fn request_task_to_execute(&self, executor: TaskExecutorId) -> DbResult<Option<Task>> {
        if executor.is_unknown() {
            return Err(TaskError::InvalidExecutorId.into());
        }

        let mut skip: HashSet<TaskId> = HashSet::new();
        loop {
            // Optimistic scan outside the transaction; sled cannot
            // iterate inside one. The claim below re-validates.
            let Some(candidate) = self.find_best_ready(&skip)? else {
                return Ok(None);
            };
            let id = candidate.id();
            let now = self.clock.now();

            let claimed = self.config.with_retry((&self.task_tree,), |(tt,)| {
                let Some(mut entry) = tt.get(&id).map_err(tx_op_error)? else {
                    return Ok(None);
                };
                if entry.status != TaskStatus::WaitingForExecutor {
                    return Ok(None);
                }
                entry.start(executor, now).map_err(abort_with)?;
                tt.insert(&id, &entry).map_err(tx_op_error)?;
                Ok(Some(entry.task))
            })?;

            match claimed {
                Some(task) => {
                    self.metrics.record_task_started(task.task_type);
                    debug!(%id, %executor, "assigned task");
                    return Ok(Some(task));
                }
                // Lost the race for this candidate; look for another.
                None => {
                    skip.insert(id);
                }
            }
        }
    }

    fn process_task_result(&self, result: &TaskResult) -> DbResult<()> {
        let now = self.clock.now();

        let outcome = self
            .config
            .with_retry((&self.task_tree, &self.batch_idx_tree), |(tt, bt)| {
                let Some(mut entry) = tt.get(&result.task_id).map_err(tx_op_error)? else {
                    // Already purged or never existed; results are
                    // idempotent.
                    return Ok(ProcessOutcome::Missing);
                };

                if let TaskOutcome::Failure(err) = &result.outcome {
                    if err.is_retryable() {
                        check_report_applies(&entry, result)?;
                        entry.reset_running().map_err(abort_with)?;
                        tt.insert(&entry.id(), &entry).map_err(tx_op_error)?;
                        return Ok(ProcessOutcome::Rescheduled(entry.task.task_type));
                    }
                    // A critical failure poisons everything downstream
                    // of this task's batch.
                    if err.kind == TaskErrorKind::Critical
                        && let Some(batch) = entry.task.batch_id
                    {
                        check_report_applies(&entry, result)?;
                        cancel_next_batches_tasks(&tt, &bt, batch, result.sender, now)?;
                    }
                }

                entry.terminate(result, now).map_err(abort_with)?;

                let dep_result = DependencyResult::from(result);
                for dep_id in entry.dependents.iter() {
                    if let Some(mut dependent) = tt.get(dep_id).map_err(tx_op_error)? {
                        dependent
                            .add_dependency_result(dep_result.clone())
                            .map_err(abort_with)?;
                        tt.insert(dep_id, &dependent).map_err(tx_op_error)?;
                    }
                }

                let status = entry.status;
                if status == TaskStatus::Completed {
                    // Completed work is purged; failed and cancelled
                    // entries are retained for inspection.
                    tt.remove(&entry.id()).map_err(tx_op_error)?;
                    if let Some(parent_batch) = entry.task.parent_batch_id
                        && let Some(mut set) = bt.get(&parent_batch).map_err(tx_op_error)?
                    {
                        set.remove(&entry.id());
                        if set.is_empty() {
                            bt.remove(&parent_batch).map_err(tx_op_error)?;
                        } else {
                            bt.insert(&parent_batch, &set).map_err(tx_op_error)?;
                        }
                    }
                } else {
                    tt.insert(&entry.id(), &entry).map_err(tx_op_error)?;
                }

                Ok(ProcessOutcome::Terminated(entry.task.task_type, status))
            })?;

        match outcome {
            ProcessOutcome::Missing => {
                debug!(id = %result.task_id, "result for unknown task, ignoring");
            }
            ProcessOutcome::Rescheduled(task_type) => {
                self.metrics.record_task_rescheduled(task_type, result.sender);
            }
            ProcessOutcome::Terminated(task_type, status) => {
                self.metrics.record_task_terminated(task_type, status);
            }
        }
        Ok(())
    }

    fn reschedule_hanging_tasks(
        &self,
        timeout: Duration,
    ) -> DbResult<Vec<(TaskType, TaskExecutorId)>> {
        let now = self.clock.now();
        let timeout_ms = timeout.as_millis() as u64;

        let mut hanging = Vec::new();
        for res in self.task_tree.iter() {
            let (_, entry) = res?;
            if entry.status != TaskStatus::Running {
                continue;
            }
            let Some(started) = entry.started else {
                continue;
            };
            if started.saturating_elapsed(now) >= timeout_ms {
                hanging.push(entry.id());
                if hanging.len() >= MAX_RESCHEDULES_PER_CALL {
                    break;
                }
            }
        }

        let mut rescheduled = Vec::new();
        for id in hanging {
            // Re-validated transactionally; the executor may have
            // reported in between the scan and the claim.
            let reset = self.config.with_retry((&self.task_tree,), |(tt,)| {
                let Some(mut entry) = tt.get(&id).map_err(tx_op_error)? else {
                    return Ok(None);
                };
                if entry.status != TaskStatus::Running {
                    return Ok(None);
                }
                let Some(started) = entry.started else {
                    return Ok(None);
                };
                if started.saturating_elapsed(now) < timeout_ms {
                    return Ok(None);
                }
                let previous = entry.owner;
                entry.reset_running().map_err(abort_with)?;
                tt.insert(&id, &entry).map_err(tx_op_error)?;
                Ok(Some((entry.task.task_type, previous)))
            })?;

            if let Some((task_type, previous)) = reset {
                warn!(%id, executor = %previous, "rescheduling hanging task");
                self.metrics.record_task_rescheduled(task_type, previous);
                rescheduled.push((task_type, previous));
            }
        }
        Ok(rescheduled)
    }
}

#[cfg(test)]
mod tests {
    use strata_task_types::{BlockHash, BlockRef, CircuitType, ShardId};

    use super::*;

    fn setup_db() -> TaskDBSled {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let sled_db = SledDb::new(Arc::new(db)).unwrap();
        TaskDBSled::new(Arc::new(sled_db), SledDbConfig::test()).unwrap()
    }

    fn task(batch: Option<BatchId>, parent_batch: Option<BatchId>) -> Task {
        Task::new(
            TaskId::random(),
            batch,
            parent_batch,
            BlockRef::new(ShardId(0), 1, BlockHash::new([0; 32])),
            TaskType::ProofBlock,
            CircuitType::Zkevm,
        )
    }

    #[test]
    fn test_duplicate_insert_aborts_whole_batch() {
        let db = setup_db();
        let existing = TaskEntry::new(task(None, None), Timestamp::from_millis(1));
        db.add_task_entries(std::slice::from_ref(&existing)).unwrap();

        let fresh = TaskEntry::new(task(None, None), Timestamp::from_millis(2));
        let err = db
            .add_task_entries(&[fresh.clone(), existing.clone()])
            .unwrap_err();
        assert!(matches!(err, DbError::TaskAlreadyExists(id) if id == existing.id()));

        // Nothing from the failed batch landed.
        assert!(db.try_get_task_entry(&fresh.id()).unwrap().is_none());
    }

    #[test]
    fn test_batch_index_written_under_parent_batch() {
        let db = setup_db();
        let parent_batch = BatchId::random();
        let own_batch = BatchId::random();

        let entry = TaskEntry::new(
            task(Some(own_batch), Some(parent_batch)),
            Timestamp::from_millis(1),
        );
        db.add_task_entries(std::slice::from_ref(&entry)).unwrap();

        let indexed = db.batch_idx_tree.get(&parent_batch).unwrap().unwrap();
        assert!(indexed.contains(&entry.id()));
        assert!(db.batch_idx_tree.get(&own_batch).unwrap().is_none());
    }

    #[test]
    fn test_index_entry_dropped_when_set_drains() {
        let db = setup_db();
        let parent_batch = BatchId::random();

        let entry = TaskEntry::new(task(None, Some(parent_batch)), Timestamp::from_millis(1));
        db.add_task_entries(std::slice::from_ref(&entry)).unwrap();

        let assigned = db.request_task_to_execute(TaskExecutorId(1)).unwrap().unwrap();
        db.process_task_result(&TaskResult::success(
            assigned.id,
            TaskExecutorId(1),
            vec![1],
        ))
        .unwrap();

        assert!(db.try_get_task_entry(&entry.id()).unwrap().is_none());
        assert!(db.batch_idx_tree.get(&parent_batch).unwrap().is_none());
    }

    #[test]
    fn test_unknown_executor_cannot_request() {
        let db = setup_db();
        let err = db
            .request_task_to_execute(TaskExecutorId::UNKNOWN)
            .unwrap_err();
        assert!(matches!(err, DbError::Task(TaskError::InvalidExecutorId)));
    }
}
