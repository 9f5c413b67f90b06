use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::AssetStatus;
use crate::issuance::{Recipient, ReturnCondition};
use crate::repair::RepairOutcome;
use crate::ticket::TicketStatus;

/// Lifecycle event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Assets
    AssetRegistered {
        asset_id: String,
        barcode: String,
        name: String,
        registered_by: String,
    },
    AssetStatusChanged {
        asset_id: String,
        from_status: AssetStatus,
        to_status: AssetStatus,
        /// Why the change happened (workflow step or operator note)
        reason: String,
        actor_id: String,
    },

    // Tickets
    TicketCreated {
        ticket_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset_id: Option<String>,
        reporter_id: String,
        title: String,
    },
    TicketStatusChanged {
        ticket_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset_id: Option<String>,
        from_status: TicketStatus,
        to_status: TicketStatus,
        actor_id: String,
    },
    TicketAssigned {
        ticket_id: String,
        assignee_id: String,
        actor_id: String,
    },
    TicketCommented {
        ticket_id: String,
        comment_id: String,
        author_id: String,
    },

    // Repairs
    RepairOpened {
        repair_id: String,
        ticket_id: String,
        asset_id: String,
        technician_id: String,
    },
    RepairDiagnosed {
        repair_id: String,
        ticket_id: String,
        actor_id: String,
    },
    RepairCompleted {
        repair_id: String,
        ticket_id: String,
        asset_id: String,
        outcome: RepairOutcome,
        actor_id: String,
    },
    RepairReturned {
        repair_id: String,
        ticket_id: String,
        asset_id: String,
        actor_id: String,
    },

    // Issuances
    AssetCheckedOut {
        issuance_id: String,
        asset_id: String,
        recipient: Recipient,
        issued_by: String,
    },
    AssetReturned {
        issuance_id: String,
        asset_id: String,
        condition: ReturnCondition,
        received_by: String,
    },

    // Maintenance
    ReconciliationCompleted {
        assets_checked: u32,
        assets_changed: u32,
        tickets_repaired: u32,
    },
}

impl LifecycleEvent {
    /// Get the event type as a string (matches serde tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::AssetRegistered { .. } => "asset_registered",
            Self::AssetStatusChanged { .. } => "asset_status_changed",
            Self::TicketCreated { .. } => "ticket_created",
            Self::TicketStatusChanged { .. } => "ticket_status_changed",
            Self::TicketAssigned { .. } => "ticket_assigned",
            Self::TicketCommented { .. } => "ticket_commented",
            Self::RepairOpened { .. } => "repair_opened",
            Self::RepairDiagnosed { .. } => "repair_diagnosed",
            Self::RepairCompleted { .. } => "repair_completed",
            Self::RepairReturned { .. } => "repair_returned",
            Self::AssetCheckedOut { .. } => "asset_checked_out",
            Self::AssetReturned { .. } => "asset_returned",
            Self::ReconciliationCompleted { .. } => "reconciliation_completed",
        }
    }

    /// Extract asset_id if this event relates to an asset
    pub fn asset_id(&self) -> Option<&str> {
        match self {
            Self::AssetRegistered { asset_id, .. }
            | Self::AssetStatusChanged { asset_id, .. }
            | Self::RepairOpened { asset_id, .. }
            | Self::RepairCompleted { asset_id, .. }
            | Self::RepairReturned { asset_id, .. }
            | Self::AssetCheckedOut { asset_id, .. }
            | Self::AssetReturned { asset_id, .. } => Some(asset_id),
            Self::TicketCreated { asset_id, .. } | Self::TicketStatusChanged { asset_id, .. } => {
                asset_id.as_deref()
            }
            _ => None,
        }
    }

    /// Extract ticket_id if this event relates to a ticket
    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            Self::TicketCreated { ticket_id, .. }
            | Self::TicketStatusChanged { ticket_id, .. }
            | Self::TicketAssigned { ticket_id, .. }
            | Self::TicketCommented { ticket_id, .. }
            | Self::RepairOpened { ticket_id, .. }
            | Self::RepairDiagnosed { ticket_id, .. }
            | Self::RepairCompleted { ticket_id, .. }
            | Self::RepairReturned { ticket_id, .. } => Some(ticket_id),
            _ => None,
        }
    }

    /// Extract the acting user if present
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            Self::AssetRegistered { registered_by, .. } => Some(registered_by),
            Self::AssetStatusChanged { actor_id, .. }
            | Self::TicketStatusChanged { actor_id, .. }
            | Self::TicketAssigned { actor_id, .. }
            | Self::RepairDiagnosed { actor_id, .. }
            | Self::RepairCompleted { actor_id, .. }
            | Self::RepairReturned { actor_id, .. } => Some(actor_id),
            Self::TicketCreated { reporter_id, .. } => Some(reporter_id),
            Self::TicketCommented { author_id, .. } => Some(author_id),
            Self::RepairOpened { technician_id, .. } => Some(technician_id),
            Self::AssetCheckedOut { issued_by, .. } => Some(issued_by),
            Self::AssetReturned { received_by, .. } => Some(received_by),
            _ => None,
        }
    }
}

/// Stored event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub asset_id: Option<String>,
    pub ticket_id: Option<String>,
    pub actor_id: Option<String>,
    pub data: LifecycleEvent,
}
