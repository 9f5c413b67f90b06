//! Issuance storage trait and filter.

use super::{Issuance, IssuanceStatus};
use crate::error::StoreError;

/// Filter for querying issuances.
#[derive(Debug, Clone, Default)]
pub struct IssuanceFilter {
    pub asset_id: Option<String>,
    pub status: Option<IssuanceStatus>,
    /// Recipient id, regardless of kind.
    pub recipient_id: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl IssuanceFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_asset(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    pub fn with_status(mut self, status: IssuanceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
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

/// Trait for issuance storage backends.
pub trait IssuanceStore: Send + Sync {
    /// Insert a new issuance. Fails if the asset already has an active one.
    fn insert(&self, issuance: &Issuance) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<Issuance>, StoreError>;

    /// Persist status and return details.
    fn update(&self, issuance: &Issuance) -> Result<(), StoreError>;

    /// List issuances matching the filter, newest first.
    fn list(&self, filter: &IssuanceFilter) -> Result<Vec<Issuance>, StoreError>;

    fn count(&self, filter: &IssuanceFilter) -> Result<i64, StoreError>;

    /// The asset's active issuance, if any.
    fn active_for_asset(&self, asset_id: &str) -> Result<Option<Issuance>, StoreError>;

    /// Asset ids with an active issuance.
    fn assets_with_active_issuance(&self) -> Result<Vec<String>, StoreError>;
}
