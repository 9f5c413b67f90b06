//! Core asset data types and the status transition table.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Availability status of a physical asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    InStock,
    Issued,
    UnderRepair,
    BeyondRepair,
    Disposed,
}

impl AssetStatus {
    pub const ALL: [AssetStatus; 5] = [
        AssetStatus::InStock,
        AssetStatus::Issued,
        AssetStatus::UnderRepair,
        AssetStatus::BeyondRepair,
        AssetStatus::Disposed,
    ];

    /// Statuses directly reachable from this one.
    pub fn allowed_targets(&self) -> &'static [AssetStatus] {
        match self {
            AssetStatus::InStock => &[
                AssetStatus::Issued,
                AssetStatus::UnderRepair,
                AssetStatus::Disposed,
            ],
            AssetStatus::Issued => &[AssetStatus::InStock, AssetStatus::UnderRepair],
            AssetStatus::UnderRepair => &[AssetStatus::InStock, AssetStatus::BeyondRepair],
            AssetStatus::BeyondRepair => &[AssetStatus::Disposed],
            AssetStatus::Disposed => &[],
        }
    }

    /// Whether a single step from this status to `target` is legal.
    pub fn can_transition_to(&self, target: AssetStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Shortest sequence of legal steps leading to `target`, excluding `self`.
    ///
    /// Returns an empty route when already at `target` and `None` when the
    /// target cannot be reached at all.
    pub fn route_to(&self, target: AssetStatus) -> Option<Vec<AssetStatus>> {
        if *self == target {
            return Some(Vec::new());
        }

        let mut previous: HashMap<AssetStatus, AssetStatus> = HashMap::new();
        let mut queue = VecDeque::from([*self]);

        while let Some(status) = queue.pop_front() {
            for &next in status.allowed_targets() {
                if next == *self || previous.contains_key(&next) {
                    continue;
                }
                previous.insert(next, status);
                if next == target {
                    let mut route = vec![target];
                    let mut cursor = target;
                    while let Some(&prev) = previous.get(&cursor) {
                        if prev == *self {
                            break;
                        }
                        route.push(prev);
                        cursor = prev;
                    }
                    route.reverse();
                    return Some(route);
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Terminal-ish statuses that automatic resolution never leaves.
    pub fn is_settled(&self) -> bool {
        matches!(self, AssetStatus::BeyondRepair | AssetStatus::Disposed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::InStock => "in_stock",
            AssetStatus::Issued => "issued",
            AssetStatus::UnderRepair => "under_repair",
            AssetStatus::BeyondRepair => "beyond_repair",
            AssetStatus::Disposed => "disposed",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical asset tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub id: String,
    pub name: String,
    /// Unique scan code.
    pub barcode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub category_id: String,
    pub department_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: AssetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering an asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAsset {
    pub name: String,
    pub barcode: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub category_id: String,
    pub department_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewAsset {
    pub fn new(
        name: impl Into<String>,
        barcode: impl Into<String>,
        category_id: impl Into<String>,
        department_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            barcode: barcode.into(),
            serial_number: None,
            model: None,
            category_id: category_id.into(),
            department_id: department_id.into(),
            notes: None,
        }
    }

    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
