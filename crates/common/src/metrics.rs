//! Prometheus metrics for the task scheduler.
//!
//! Counters are labeled by task type (and terminal status or executor
//! where that matters) and are exposed for scraping via [`REGISTRY`].

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Registry, register_int_counter_vec};
use strata_task_types::{TaskExecutorId, TaskStatus, TaskType};
use strata_taskdb_types::TaskMetrics;

lazy_static! {
    /// Global registry for all metrics
    pub static ref REGISTRY: Registry = Registry::new();

    /// Counter for tasks inserted into the database
    pub static ref TASKS_ADDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "strata_tasks_added_total",
        "Total number of tasks added",
        &["task_type"]
    )
    .unwrap();

    /// Counter for tasks handed to an executor
    pub static ref TASKS_STARTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "strata_tasks_started_total",
        "Total number of task assignments to executors",
        &["task_type"]
    )
    .unwrap();

    /// Counter for tasks reaching a terminal state
    pub static ref TASKS_TERMINATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "strata_tasks_terminated_total",
        "Total number of tasks terminated",
        &["task_type", "status"] // status=[completed|failed|cancelled]
    )
    .unwrap();

    /// Counter for tasks returned to the pool after a retryable failure
    /// or timeout
    pub static ref TASKS_RESCHEDULED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "strata_tasks_rescheduled_total",
        "Total number of tasks rescheduled",
        &["task_type"]
    )
    .unwrap();
}

/// Helper to register all metrics with the global registry
pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(TASKS_ADDED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TASKS_STARTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TASKS_TERMINATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TASKS_RESCHEDULED_TOTAL.clone()))?;
    Ok(())
}

fn task_type_label(task_type: TaskType) -> &'static str {
    match task_type {
        TaskType::ProofBlock => "proof_block",
        TaskType::PartialProve => "partial_prove",
        TaskType::AggregateChallenges => "aggregate_challenges",
        TaskType::CombinedQ => "combined_q",
        TaskType::AggregateFri => "aggregate_fri",
        TaskType::FriConsistencyCheck => "fri_consistency_check",
        TaskType::MergeProof => "merge_proof",
        TaskType::AggregateProofs => "aggregate_proofs",
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::WaitingForInput => "waiting_for_input",
        TaskStatus::WaitingForExecutor => "waiting_for_executor",
        TaskStatus::Running => "running",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
    }
}

/// [`TaskMetrics`] sink backed by the Prometheus counters above.
#[derive(Copy, Clone, Debug, Default)]
pub struct PrometheusTaskMetrics;

impl TaskMetrics for PrometheusTaskMetrics {
    fn record_task_added(&self, task_type: TaskType) {
        TASKS_ADDED_TOTAL
            .with_label_values(&[task_type_label(task_type)])
            .inc();
    }

    fn record_task_started(&self, task_type: TaskType) {
        TASKS_STARTED_TOTAL
            .with_label_values(&[task_type_label(task_type)])
            .inc();
    }

    fn record_task_terminated(&self, task_type: TaskType, status: TaskStatus) {
        TASKS_TERMINATED_TOTAL
            .with_label_values(&[task_type_label(task_type), status_label(status)])
            .inc();
    }

    fn record_task_rescheduled(&self, task_type: TaskType, _previous_executor: TaskExecutorId) {
        TASKS_RESCHEDULED_TOTAL
            .with_label_values(&[task_type_label(task_type)])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let metrics = PrometheusTaskMetrics;

        let before = TASKS_ADDED_TOTAL
            .with_label_values(&["proof_block"])
            .get();
        metrics.record_task_added(TaskType::ProofBlock);
        let after = TASKS_ADDED_TOTAL
            .with_label_values(&["proof_block"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_terminated_counter_splits_by_status() {
        let metrics = PrometheusTaskMetrics;

        let completed_before = TASKS_TERMINATED_TOTAL
            .with_label_values(&["merge_proof", "completed"])
            .get();
        let failed_before = TASKS_TERMINATED_TOTAL
            .with_label_values(&["merge_proof", "failed"])
            .get();

        metrics.record_task_terminated(TaskType::MergeProof, TaskStatus::Completed);
        metrics.record_task_terminated(TaskType::MergeProof, TaskStatus::Failed);

        assert_eq!(
            TASKS_TERMINATED_TOTAL
                .with_label_values(&["merge_proof", "completed"])
                .get(),
            completed_before + 1
        );
        assert_eq!(
            TASKS_TERMINATED_TOTAL
                .with_label_values(&["merge_proof", "failed"])
                .get(),
            failed_before + 1
        );
    }
}
