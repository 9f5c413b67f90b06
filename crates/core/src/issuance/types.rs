//! Core issuance data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::AssetStatus;
use crate::directory::DirectoryKind;

/// Who receives an issued asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Employee(String),
    Department(String),
}

impl Recipient {
    pub fn id(&self) -> &str {
        match self {
            Recipient::Employee(id) | Recipient::Department(id) => id,
        }
    }

    pub fn directory_kind(&self) -> DirectoryKind {
        match self {
            Recipient::Employee(_) => DirectoryKind::Employee,
            Recipient::Department(_) => DirectoryKind::Department,
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.directory_kind(), self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceStatus {
    Active,
    Returned,
}

impl fmt::Display for IssuanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssuanceStatus::Active => f.write_str("active"),
            IssuanceStatus::Returned => f.write_str("returned"),
        }
    }
}

/// Condition of an asset when it comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Good,
    Damaged,
    NeedsRepair,
    BeyondRepair,
}

impl ReturnCondition {
    /// Status the return asks for; other open workflows may override it.
    pub fn intended_status(&self) -> AssetStatus {
        match self {
            ReturnCondition::Good => AssetStatus::InStock,
            ReturnCondition::Damaged | ReturnCondition::NeedsRepair => AssetStatus::UnderRepair,
            ReturnCondition::BeyondRepair => AssetStatus::BeyondRepair,
        }
    }

    /// Whether the condition calls for a repair ticket.
    pub fn needs_attention(&self) -> bool {
        matches!(self, ReturnCondition::Damaged | ReturnCondition::NeedsRepair)
    }
}

impl fmt::Display for ReturnCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnCondition::Good => "good",
            ReturnCondition::Damaged => "damaged",
            ReturnCondition::NeedsRepair => "needs_repair",
            ReturnCondition::BeyondRepair => "beyond_repair",
        };
        f.write_str(name)
    }
}

/// A checkout of an asset to a recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issuance {
    pub id: String,
    pub asset_id: String,
    pub recipient: Recipient,
    pub issued_by: String,
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<DateTime<Utc>>,
    pub status: IssuanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_condition: Option<ReturnCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Input for checking an asset out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkout {
    pub asset_id: String,
    pub recipient: Recipient,
    #[serde(default)]
    pub expected_return: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl Checkout {
    pub fn new(asset_id: impl Into<String>, recipient: Recipient) -> Self {
        Self {
            asset_id: asset_id.into(),
            recipient,
            expected_return: None,
            remarks: None,
        }
    }

    pub fn with_expected_return(mut self, expected_return: DateTime<Utc>) -> Self {
        self.expected_return = Some(expected_return);
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

/// Input for returning an issued asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnAsset {
    pub condition: ReturnCondition,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl ReturnAsset {
    pub fn new(condition: ReturnCondition) -> Self {
        Self {
            condition,
            remarks: None,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}
