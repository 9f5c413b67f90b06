use chrono::{DateTime, Utc};

use super::EventRecord;
use crate::error::StoreError;

/// Filter for querying lifecycle events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub asset_id: Option<String>,
    pub ticket_id: Option<String>,
    pub event_type: Option<String>,
    pub actor_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl EventFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_asset_id(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    pub fn with_ticket_id(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_time_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.from = from;
        self.to = to;
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

/// Trait for lifecycle event storage
pub trait EventStore: Send + Sync {
    /// Insert an event record, returns the assigned ID
    fn insert(&self, record: &EventRecord) -> Result<i64, StoreError>;

    /// Query event records, newest first
    fn query(&self, filter: &EventFilter) -> Result<Vec<EventRecord>, StoreError>;

    /// Count matching event records
    fn count(&self, filter: &EventFilter) -> Result<i64, StoreError>;
}
