//! Core ticket data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a support ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    WaitingParts,
    Resolved,
    Closed,
    /// Closed because the asset was written off.
    DefectiveClosed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 6] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::WaitingParts,
        TicketStatus::Resolved,
        TicketStatus::Closed,
        TicketStatus::DefectiveClosed,
    ];

    /// Statuses that still claim the referenced asset.
    pub const OPEN_FAMILY: [TicketStatus; 3] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::WaitingParts,
    ];

    /// Whether the ticket still claims its asset.
    pub fn is_open_family(&self) -> bool {
        Self::OPEN_FAMILY.contains(self)
    }

    /// Whether the ticket is closed for good.
    pub fn is_closed(&self) -> bool {
        matches!(self, TicketStatus::Closed | TicketStatus::DefectiveClosed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::WaitingParts => "waiting_parts",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
            TicketStatus::DefectiveClosed => "defective_closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// A comment appended to a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub ticket_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A support ticket, optionally about a specific asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub reporter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    pub status: TicketStatus,
    /// Ordered oldest first; empty in list results.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Set the first time the ticket reaches resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Set the first time the ticket reaches closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for opening a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTicket {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: TicketPriority,
    /// Defaults to the acting user when absent.
    #[serde(default)]
    pub reporter_id: Option<String>,
}

impl NewTicket {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: TicketPriority::default(),
            reporter_id: None,
        }
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_reporter(mut self, reporter_id: impl Into<String>) -> Self {
        self.reporter_id = Some(reporter_id.into());
        self
    }
}
