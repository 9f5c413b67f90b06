//! Repair storage trait and filter.

use super::{RepairOutcome, RepairRecord};
use crate::error::StoreError;

/// Filter for querying repairs.
#[derive(Debug, Clone, Default)]
pub struct RepairFilter {
    pub ticket_id: Option<String>,
    pub asset_id: Option<String>,
    pub outcome: Option<RepairOutcome>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl RepairFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_ticket(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    pub fn with_asset(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    pub fn with_outcome(mut self, outcome: RepairOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for repair storage backends.
pub trait RepairStore: Send + Sync {
    fn insert(&self, record: &RepairRecord) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<RepairRecord>, StoreError>;

    /// Persist diagnosis, outcome, notes, custody flag and timestamps.
    fn update(&self, record: &RepairRecord) -> Result<(), StoreError>;

    /// List repairs matching the filter, most recently received first.
    fn list(&self, filter: &RepairFilter) -> Result<Vec<RepairRecord>, StoreError>;

    fn count(&self, filter: &RepairFilter) -> Result<i64, StoreError>;

    /// Most recently received repair for the asset.
    fn latest_for_asset(&self, asset_id: &str) -> Result<Option<RepairRecord>, StoreError>;

    /// Most recently received repair for the ticket.
    fn latest_for_ticket(&self, ticket_id: &str) -> Result<Option<RepairRecord>, StoreError>;

    /// Pending repairs, oldest first.
    fn pending(&self) -> Result<Vec<RepairRecord>, StoreError>;
}
