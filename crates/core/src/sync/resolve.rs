//! The status resolution policy.
//!
//! Given everything that currently claims an asset, decide which status the
//! asset should be in. Pure: no stores, no locks.

use serde::Serialize;

use crate::asset::AssetStatus;
use crate::issuance::Issuance;
use crate::repair::{RepairOutcome, RepairRecord};
use crate::ticket::Ticket;

/// Every active workflow referencing one asset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowSnapshot {
    /// Tickets in the open family.
    pub open_tickets: Vec<Ticket>,
    /// Most recently received repair.
    pub latest_repair: Option<RepairRecord>,
    pub active_issuance: Option<Issuance>,
}

/// What should happen to the asset's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// Leave the status as it is.
    Keep,
    /// Move to this status.
    Target(AssetStatus),
}

impl Resolution {
    /// The status the asset ends up in.
    pub fn status_from(&self, current: AssetStatus) -> AssetStatus {
        match self {
            Resolution::Keep => current,
            Resolution::Target(status) => *status,
        }
    }
}

/// Resolve the asset's status.
///
/// `intent` is the status the calling workflow asks for (a return condition);
/// it only wins when no open ticket, repair verdict or issuance outranks it.
pub fn resolve(
    current: AssetStatus,
    snapshot: &WorkflowSnapshot,
    intent: Option<AssetStatus>,
) -> Resolution {
    if current.is_settled() {
        return Resolution::Keep;
    }

    let latest = snapshot.latest_repair.as_ref();

    if latest.is_some_and(|r| r.outcome == RepairOutcome::BeyondRepair) {
        return Resolution::Target(AssetStatus::BeyondRepair);
    }

    if !snapshot.open_tickets.is_empty() {
        return Resolution::Target(AssetStatus::UnderRepair);
    }

    if snapshot.active_issuance.is_some() {
        return Resolution::Target(AssetStatus::Issued);
    }

    if let Some(intent) = intent {
        return Resolution::Target(intent);
    }

    if latest.is_some_and(RepairRecord::awaiting_return) {
        return Resolution::Keep;
    }

    Resolution::Target(AssetStatus::InStock)
}
