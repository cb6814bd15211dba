//! The immutable task payload handed to executors.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    id::{BatchId, BlockRef, TaskId},
    result::DependencyResult,
};

/// The kind of proof work a task performs.
///
/// The numeric discriminant is part of the priority tie-break, so new
/// variants must only be appended.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
#[borsh(use_discriminant = true)]
pub enum TaskType {
    ProofBlock = 0,
    PartialProve = 1,
    AggregateChallenges = 2,
    CombinedQ = 3,
    AggregateFri = 4,
    FriConsistencyCheck = 5,
    MergeProof = 6,
    /// Cross-batch aggregation. Deprioritized by the selection rule so
    /// fresh per-block work drains first.
    AggregateProofs = 7,
}

impl TaskType {
    /// Ordinal used for deterministic tie-breaking.
    pub const fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub const fn is_aggregation(&self) -> bool {
        matches!(self, TaskType::AggregateProofs)
    }
}

/// The circuit a proving task runs, where applicable.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum CircuitType {
    #[default]
    None,
    Bytecode,
    ReadWrite,
    Mpt,
    Zkevm,
}

/// Work description for one proof step.
///
/// Treated as immutable once created; all mutable scheduling state lives
/// in [`crate::TaskEntry`]. The one exception is `dependency_results`,
/// which the scheduler fills in as upstream tasks finish so the executor
/// receives its inputs inline.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Task {
    /// Unique id, also the storage key.
    pub id: TaskId,
    /// The batch this task belongs to, if any.
    pub batch_id: Option<BatchId>,
    /// Parent of the owning batch. Tasks are indexed under this id so a
    /// batch's descendants can be walked without scanning.
    pub parent_batch_id: Option<BatchId>,
    /// The block this task proves over.
    pub block_ref: BlockRef,
    pub task_type: TaskType,
    pub circuit_type: CircuitType,
    /// Task that consumes this task's output, if already known.
    pub parent_task_id: Option<TaskId>,
    /// Outcomes of resolved dependencies, keyed by the dependency id.
    pub dependency_results: BTreeMap<TaskId, DependencyResult>,
}

impl Task {
    pub fn new(
        id: TaskId,
        batch_id: Option<BatchId>,
        parent_batch_id: Option<BatchId>,
        block_ref: BlockRef,
        task_type: TaskType,
        circuit_type: CircuitType,
    ) -> Self {
        Self {
            id,
            batch_id,
            parent_batch_id,
            block_ref,
            task_type,
            circuit_type,
            parent_task_id: None,
            dependency_results: BTreeMap::new(),
        }
    }
}
