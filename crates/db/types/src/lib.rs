//! Storage-facing contracts for the task scheduler: the error taxonomy,
//! the [`TaskDatabase`] trait implemented by storage engines, and the
//! collaborator traits ([`Clock`], [`TaskMetrics`]) injected into them.

pub mod errors;
pub mod traits;

pub use errors::{DbError, DbResult};
pub use traits::{Clock, NoopTaskMetrics, SystemClock, TaskDatabase, TaskMetrics};
