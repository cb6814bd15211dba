use strata_task_types::{BatchId, TaskEntry, TaskId, TaskIdSet};

use crate::define_table_with_id_key;

define_table_with_id_key!(
    /// Primary task store.
    (TaskEntrySchema, "task_entries") TaskId => TaskEntry
);

define_table_with_id_key!(
    /// Secondary index from a parent batch id to the set of task ids it
    /// parents. Cascade cancellation walks this instead of scanning the
    /// primary table.
    (TaskBatchIndexSchema, "task_parent_batch_idx") BatchId => TaskIdSet
);
