//! Core repair data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a repair. Leaves `pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOutcome {
    Pending,
    Fixed,
    BeyondRepair,
}

impl RepairOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairOutcome::Pending => "pending",
            RepairOutcome::Fixed => "fixed",
            RepairOutcome::BeyondRepair => "beyond_repair",
        }
    }
}

impl fmt::Display for RepairOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcomes a technician may record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    Fixed,
    BeyondRepair,
}

impl From<CompletionOutcome> for RepairOutcome {
    fn from(outcome: CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::Fixed => RepairOutcome::Fixed,
            CompletionOutcome::BeyondRepair => RepairOutcome::BeyondRepair,
        }
    }
}

/// A physical repair bridging a ticket and its asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepairRecord {
    pub id: String,
    pub ticket_id: String,
    pub asset_id: String,
    pub technician_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    pub outcome: RepairOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions_taken: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts_used: Option<String>,
    /// Only true after a fixed outcome.
    pub returned_to_user: bool,
    pub received_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
}

impl RepairRecord {
    pub fn is_pending(&self) -> bool {
        self.outcome == RepairOutcome::Pending
    }

    /// Fixed, but the asset has not been handed back yet.
    pub fn awaiting_return(&self) -> bool {
        self.outcome == RepairOutcome::Fixed && !self.returned_to_user
    }

    /// When the repair last changed outcome or custody.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at.or(self.completed_at)
    }
}

/// Input for opening a repair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenRepair {
    pub ticket_id: String,
    /// Must match the ticket's asset when the ticket already references one.
    pub asset_id: String,
    pub technician_id: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
}

/// Input for completing a repair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompleteRepair {
    pub outcome: CompletionOutcome,
    pub actions_taken: String,
    #[serde(default)]
    pub parts_used: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_outcome_never_pending() {
        assert_eq!(RepairOutcome::from(CompletionOutcome::Fixed), RepairOutcome::Fixed);
        assert_eq!(
            RepairOutcome::from(CompletionOutcome::BeyondRepair),
            RepairOutcome::BeyondRepair
        );
        let parsed: Result<CompletionOutcome, _> = serde_json::from_str("\"pending\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_finished_at_prefers_return() {
        let received = Utc::now();
        let mut record = RepairRecord {
            id: "r-1".to_string(),
            ticket_id: "t-1".to_string(),
            asset_id: "a-1".to_string(),
            technician_id: "tech".to_string(),
            diagnosis: None,
            outcome: RepairOutcome::Pending,
            actions_taken: None,
            parts_used: None,
            returned_to_user: false,
            received_at: received,
            completed_at: None,
            returned_at: None,
        };
        assert!(record.is_pending());
        assert_eq!(record.finished_at(), None);

        let completed = received + chrono::Duration::minutes(5);
        record.outcome = RepairOutcome::Fixed;
        record.completed_at = Some(completed);
        assert!(record.awaiting_return());
        assert_eq!(record.finished_at(), Some(completed));

        let returned = completed + chrono::Duration::minutes(5);
        record.returned_to_user = true;
        record.returned_at = Some(returned);
        assert!(!record.awaiting_return());
        assert_eq!(record.finished_at(), Some(returned));
    }
}
