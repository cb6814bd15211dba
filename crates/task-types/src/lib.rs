//! Core model types for the proof task scheduler.
//!
//! This crate is pure data: identifiers, the task payload, the
//! [`TaskEntry`] state machine with its dependency bookkeeping, result
//! types reported by executors, and read-only view projections. It has
//! no I/O; persistence lives in the store crates.

pub mod entry;
pub mod errors;
pub mod id;
pub mod result;
pub mod set;
pub mod task;
pub mod view;

pub use entry::{TaskEntry, TaskStatus};
pub use errors::TaskError;
pub use id::{BatchId, BlockHash, BlockRef, ShardId, TaskExecutorId, TaskId, Timestamp};
pub use result::{DependencyResult, TaskErrorKind, TaskExecError, TaskOutcome, TaskResult};
pub use set::TaskIdSet;
pub use task::{CircuitType, Task, TaskType};
pub use view::{TaskTreeView, TaskView};
