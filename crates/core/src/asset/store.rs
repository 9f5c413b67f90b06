//! Asset storage trait and filter.

use chrono::{DateTime, Utc};

use super::{Asset, AssetStatus};
use crate::error::StoreError;

/// Filter for querying assets.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub status: Option<AssetStatus>,
    pub department_id: Option<String>,
    pub category_id: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl AssetFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: AssetStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_department(mut self, department_id: impl Into<String>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
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

/// Trait for asset storage backends.
///
/// Stores persist records; they do not enforce the transition table.
pub trait AssetStore: Send + Sync {
    /// Insert a new asset. Fails if the id or barcode already exists.
    fn insert(&self, asset: &Asset) -> Result<(), StoreError>;

    /// Get an asset by ID.
    fn get(&self, id: &str) -> Result<Option<Asset>, StoreError>;

    /// Get an asset by its barcode.
    fn get_by_barcode(&self, barcode: &str) -> Result<Option<Asset>, StoreError>;

    /// Overwrite an asset's status and updated_at.
    fn update_status(
        &self,
        id: &str,
        status: AssetStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// List assets matching the filter, oldest first.
    fn list(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StoreError>;

    /// Count assets matching the filter.
    fn count(&self, filter: &AssetFilter) -> Result<i64, StoreError>;
}
