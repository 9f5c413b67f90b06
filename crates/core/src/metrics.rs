//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Asset status transitions (applied and rejected)
//! - Workflow operations (tickets, repairs, issuances)
//! - Reconciliation and notification delivery

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Asset Registry
// =============================================================================

/// Applied asset status transitions by edge.
pub static ASSET_STATUS_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "custodian_asset_status_transitions_total",
            "Applied asset status transitions",
        ),
        &["from", "to"],
    )
    .unwrap()
});

/// Transitions refused by the transition table.
pub static TRANSITIONS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "custodian_asset_transitions_rejected_total",
            "Asset status transitions rejected by the transition table",
        ),
        &["from", "to"],
    )
    .unwrap()
});

/// Assets registered.
pub static ASSETS_REGISTERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("custodian_assets_registered_total", "Assets registered").unwrap()
});

// =============================================================================
// Workflows
// =============================================================================

/// Workflow operations by outcome.
pub static WORKFLOW_OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "custodian_workflow_operations_total",
            "Workflow operations by workflow, operation and result",
        ),
        &["workflow", "operation", "result"], // result: "ok" or the error kind
    )
    .unwrap()
});

/// Number of status steps applied per synchronization.
pub static SYNC_ROUTE_LENGTH: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "custodian_sync_route_length",
            "Asset status steps applied per synchronization",
        )
        .buckets(vec![0.0, 1.0, 2.0, 3.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Maintenance
// =============================================================================

/// Repairs made by the reconciliation pass.
pub static RECONCILE_REPAIRS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "custodian_reconcile_repairs_total",
            "Inconsistencies repaired by reconciliation",
        ),
        &["kind"], // "ticket_linked", "ticket_in_progress", "ticket_resolved", "ticket_closed", "asset_status"
    )
    .unwrap()
});

// =============================================================================
// Notifications
// =============================================================================

/// Lifecycle events dropped because the channel was full or closed.
pub static NOTIFICATIONS_DROPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "custodian_notifications_dropped_total",
            "Lifecycle events that could not be queued",
        ),
        &["event_type"],
    )
    .unwrap()
});

/// Record the outcome of a workflow operation.
pub(crate) fn record_operation<T>(
    workflow: &str,
    operation: &str,
    result: &crate::error::Result<T>,
) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    WORKFLOW_OPERATIONS
        .with_label_values(&[workflow, operation, outcome])
        .inc();
}

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ASSET_STATUS_TRANSITIONS.clone()),
        Box::new(TRANSITIONS_REJECTED.clone()),
        Box::new(ASSETS_REGISTERED.clone()),
        Box::new(WORKFLOW_OPERATIONS.clone()),
        Box::new(SYNC_ROUTE_LENGTH.clone()),
        Box::new(RECONCILE_REPAIRS.clone()),
        Box::new(NOTIFICATIONS_DROPPED.clone()),
    ]
}
