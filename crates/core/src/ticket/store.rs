//! Ticket storage trait and filter.

use super::{Comment, Ticket, TicketStatus};
use crate::error::StoreError;

/// Filter for querying tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub asset_id: Option<String>,
    pub assignee_id: Option<String>,
    pub reporter_id: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TicketFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_asset(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    pub fn with_assignee(mut self, assignee_id: impl Into<String>) -> Self {
        self.assignee_id = Some(assignee_id.into());
        self
    }

    pub fn with_reporter(mut self, reporter_id: impl Into<String>) -> Self {
        self.reporter_id = Some(reporter_id.into());
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

/// Trait for ticket storage backends.
pub trait TicketStore: Send + Sync {
    /// Insert a new ticket (comments are stored separately).
    fn insert(&self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Get a ticket by ID, including its comments.
    fn get(&self, id: &str) -> Result<Option<Ticket>, StoreError>;

    /// Persist status, assignee and timestamps. The asset link is never
    /// written here; see [`TicketStore::link_asset`].
    fn update(&self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Point an unlinked ticket at an asset.
    ///
    /// Returns false when the ticket is missing or already linked to a
    /// different asset.
    fn link_asset(&self, ticket_id: &str, asset_id: &str) -> Result<bool, StoreError>;

    /// Append a comment.
    fn add_comment(&self, comment: &Comment) -> Result<(), StoreError>;

    /// List tickets matching the filter, newest first, without comments.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError>;

    /// Count tickets matching the filter.
    fn count(&self, filter: &TicketFilter) -> Result<i64, StoreError>;

    /// Tickets in the open family referencing the asset.
    fn open_for_asset(&self, asset_id: &str) -> Result<Vec<Ticket>, StoreError>;

    /// Distinct asset ids referenced by open-family tickets.
    fn assets_with_open_tickets(&self) -> Result<Vec<String>, StoreError>;
}
