//! Ticket workflow: creation, status changes and comments.

use std::sync::Arc;

use super::{Comment, NewTicket, Ticket, TicketFilter, TicketStatus, TicketStore};
use crate::access::{authorize, AccessControl, Action, Actor, Resource};
use crate::db;
use crate::directory::{self, Directory, DirectoryKind};
use crate::error::{EntityKind, LifecycleError, Result};
use crate::events::{LifecycleEvent, NotificationService};
use crate::metrics;
use crate::sync::{AssetLocks, LifecycleSynchronizer};

/// Moves tickets through their statuses and keeps referenced assets in sync.
///
/// Lock order is asset before ticket. The ticket lock guards the asset link
/// and any write to a ticket that has no asset yet.
pub struct TicketWorkflow {
    store: Arc<dyn TicketStore>,
    ticket_locks: AssetLocks,
    synchronizer: Arc<LifecycleSynchronizer>,
    access: Arc<dyn AccessControl>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn NotificationService>,
}

impl TicketWorkflow {
    pub fn new(
        store: Arc<dyn TicketStore>,
        synchronizer: Arc<LifecycleSynchronizer>,
        access: Arc<dyn AccessControl>,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            store,
            ticket_locks: AssetLocks::new(),
            synchronizer,
            access,
            directory,
            notifier,
        }
    }

    /// Open a ticket, optionally about an asset. The asset's status is not touched.
    pub fn create(
        &self,
        actor: &Actor,
        new: NewTicket,
        asset_id: Option<&str>,
    ) -> Result<Ticket> {
        let result = authorize(self.access.as_ref(), actor, Resource::Ticket, Action::Create)
            .and_then(|()| {
                let reporter_id = new.reporter_id.clone().unwrap_or_else(|| actor.id.clone());
                directory::require(self.directory.as_ref(), DirectoryKind::User, &reporter_id)?;
                if let Some(asset_id) = asset_id {
                    self.synchronizer.registry().find(asset_id)?;
                }
                self.insert(new, reporter_id, asset_id)
            });
        metrics::record_operation("ticket", "create", &result);
        result
    }

    /// Change a ticket's status, then settle the referenced asset.
    ///
    /// Setting an assignee on an open ticket moves it to in_progress
    /// regardless of `target`.
    pub fn update_status(
        &self,
        actor: &Actor,
        ticket_id: &str,
        target: TicketStatus,
        assignee_id: Option<String>,
    ) -> Result<Ticket> {
        let result = self.update_status_inner(actor, ticket_id, target, assignee_id);
        metrics::record_operation("ticket", "update_status", &result);
        result
    }

    fn update_status_inner(
        &self,
        actor: &Actor,
        ticket_id: &str,
        target: TicketStatus,
        assignee_id: Option<String>,
    ) -> Result<Ticket> {
        authorize(self.access.as_ref(), actor, Resource::Ticket, Action::Update)?;
        if let Some(ref assignee_id) = assignee_id {
            directory::require(self.directory.as_ref(), DirectoryKind::User, assignee_id)?;
        }

        let locks = self.synchronizer.registry().locks();
        loop {
            let ticket = self.get(ticket_id)?;
            let Some(asset_id) = ticket.asset_id.clone() else {
                let outcome = self.with_ticket_lock(ticket_id, || -> Result<Option<Ticket>> {
                    // A repair may have linked the ticket since it was read.
                    let ticket = self.get(ticket_id)?;
                    if ticket.asset_id.is_some() {
                        return Ok(None);
                    }
                    self.transition_locked(ticket, target, assignee_id.clone(), actor)
                        .map(Some)
                })?;
                match outcome {
                    Some(ticket) => return Ok(ticket),
                    None => continue,
                }
            };

            let outcome = locks.with(&asset_id, || -> Result<Option<Ticket>> {
                // The asset link may have been set while we waited for the lock.
                let ticket = self.get(ticket_id)?;
                if ticket.asset_id.as_deref() != Some(asset_id.as_str()) {
                    return Ok(None);
                }
                let ticket = self.transition_locked(ticket, target, assignee_id.clone(), actor)?;
                let reason = format!("ticket {} {}", ticket.id, ticket.status);
                self.synchronizer
                    .synchronize(&asset_id, None, &reason, actor)?;
                Ok(Some(ticket))
            })?;

            if let Some(ticket) = outcome {
                return Ok(ticket);
            }
        }
    }

    /// Append a comment. Allowed for the reporter, the assignee, or any role
    /// that may update tickets.
    pub fn add_comment(&self, actor: &Actor, ticket_id: &str, text: &str) -> Result<Comment> {
        let result = self.add_comment_inner(actor, ticket_id, text);
        metrics::record_operation("ticket", "add_comment", &result);
        result
    }

    fn add_comment_inner(&self, actor: &Actor, ticket_id: &str, text: &str) -> Result<Comment> {
        let ticket = self.get(ticket_id)?;

        let is_participant = ticket.reporter_id == actor.id
            || ticket.assignee_id.as_deref() == Some(actor.id.as_str());
        if !is_participant {
            authorize(self.access.as_ref(), actor, Resource::Ticket, Action::Update)?;
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(LifecycleError::validation("Comment text is required"));
        }

        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            ticket_id: ticket.id.clone(),
            author_id: actor.id.clone(),
            text: text.to_string(),
            created_at: db::now(),
        };
        self.store.add_comment(&comment)?;

        self.notifier.notify(LifecycleEvent::TicketCommented {
            ticket_id: ticket.id,
            comment_id: comment.id.clone(),
            author_id: comment.author_id.clone(),
        });

        Ok(comment)
    }

    /// Fetch a ticket with its comments.
    pub fn get(&self, ticket_id: &str) -> Result<Ticket> {
        self.store
            .get(ticket_id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Ticket, ticket_id))
    }

    pub fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        Ok(self.store.list(filter)?)
    }

    pub fn count(&self, filter: &TicketFilter) -> Result<i64> {
        Ok(self.store.count(filter)?)
    }

    /// File a ticket on behalf of another workflow. The caller has already
    /// authorized its own operation and validated the asset.
    pub(crate) fn file_for_asset(
        &self,
        reporter_id: &str,
        new: NewTicket,
        asset_id: &str,
    ) -> Result<Ticket> {
        self.insert(new, reporter_id.to_string(), Some(asset_id))
    }

    fn insert(&self, new: NewTicket, reporter_id: String, asset_id: Option<&str>) -> Result<Ticket> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(LifecycleError::validation("Ticket title is required"));
        }

        let now = db::now();
        let ticket = Ticket {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: new.description,
            priority: new.priority,
            reporter_id,
            asset_id: asset_id.map(String::from),
            assignee_id: None,
            status: TicketStatus::Open,
            comments: Vec::new(),
            resolved_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&ticket)?;

        tracing::info!(
            ticket_id = %ticket.id,
            asset_id = ?ticket.asset_id,
            reporter = %ticket.reporter_id,
            "Ticket created"
        );
        self.notifier.notify(LifecycleEvent::TicketCreated {
            ticket_id: ticket.id.clone(),
            asset_id: ticket.asset_id.clone(),
            reporter_id: ticket.reporter_id.clone(),
            title: ticket.title.clone(),
        });

        Ok(ticket)
    }

    /// Run `f` while holding the lock for `ticket_id`. Callers that also need
    /// an asset lock take it first.
    pub(crate) fn with_ticket_lock<T>(&self, ticket_id: &str, f: impl FnOnce() -> T) -> T {
        self.ticket_locks.with(ticket_id, f)
    }

    /// Link an unlinked ticket to `asset_id`. Caller holds the ticket lock.
    pub(crate) fn link_asset(&self, ticket: &mut Ticket, asset_id: &str) -> Result<()> {
        if ticket.asset_id.as_deref() == Some(asset_id) {
            return Ok(());
        }
        if !self.store.link_asset(&ticket.id, asset_id)? {
            return Err(LifecycleError::validation(format!(
                "Ticket {} is already linked to another asset",
                ticket.id
            )));
        }
        tracing::info!(ticket_id = %ticket.id, asset_id, "Ticket linked to asset");
        ticket.asset_id = Some(asset_id.to_string());
        Ok(())
    }

    /// Persist a status change (and any other edits already made to `ticket`).
    ///
    /// Does not touch the asset. When the ticket references one, the caller
    /// holds its lock and synchronizes afterwards.
    pub(crate) fn transition_locked(
        &self,
        mut ticket: Ticket,
        target: TicketStatus,
        assignee_id: Option<String>,
        actor: &Actor,
    ) -> Result<Ticket> {
        let from = ticket.status;
        let assigned = assignee_id
            .as_ref()
            .filter(|id| ticket.assignee_id.as_ref() != Some(*id))
            .cloned();

        let target = if assignee_id.is_some() && from == TicketStatus::Open {
            TicketStatus::InProgress
        } else {
            target
        };

        let now = db::now();
        ticket.status = target;
        if assignee_id.is_some() {
            ticket.assignee_id = assignee_id;
        }
        if target == TicketStatus::Resolved && ticket.resolved_at.is_none() {
            ticket.resolved_at = Some(now);
        }
        if target == TicketStatus::Closed && ticket.closed_at.is_none() {
            ticket.closed_at = Some(now);
        }
        ticket.updated_at = now;
        self.store.update(&ticket)?;

        if from != target {
            tracing::info!(
                ticket_id = %ticket.id,
                from = %from,
                to = %target,
                actor = %actor.id,
                "Ticket status changed"
            );
            self.notifier.notify(LifecycleEvent::TicketStatusChanged {
                ticket_id: ticket.id.clone(),
                asset_id: ticket.asset_id.clone(),
                from_status: from,
                to_status: target,
                actor_id: actor.id.clone(),
            });
        }
        if let Some(assignee_id) = assigned {
            self.notifier.notify(LifecycleEvent::TicketAssigned {
                ticket_id: ticket.id.clone(),
                assignee_id,
                actor_id: actor.id.clone(),
            });
        }

        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetStatus;
    use crate::error::ErrorKind;
    use crate::testing::{fixtures, TestLifecycle};

    #[test]
    fn test_create_does_not_change_asset() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");

        let ticket = t.open_ticket(&asset.id);
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.reporter_id, fixtures::reporter().id);
        assert_eq!(t.asset_status(&asset.id), AssetStatus::InStock);
    }

    #[test]
    fn test_create_validation() {
        let t = TestLifecycle::new();
        let tickets = t.lifecycle.tickets();

        let err = tickets
            .create(&fixtures::reporter(), NewTicket::new(" ", ""), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = tickets
            .create(&fixtures::reporter(), NewTicket::new("Noisy fan", ""), Some("nope"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = tickets
            .create(
                &fixtures::reporter(),
                NewTicket::new("Noisy fan", "").with_reporter("ghost"),
                None,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_assignee_on_open_ticket_coerces_in_progress() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        let ticket = t.open_ticket(&asset.id);

        let updated = t
            .lifecycle
            .tickets()
            .update_status(
                &fixtures::technician(),
                &ticket.id,
                TicketStatus::Open,
                Some(fixtures::technician().id),
            )
            .unwrap();

        assert_eq!(updated.status, TicketStatus::InProgress);
        assert_eq!(updated.assignee_id, Some(fixtures::technician().id));
        assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);
        assert!(t.notifier.event_types().contains(&"ticket_assigned"));
    }

    #[test]
    fn test_assignee_on_non_open_ticket_keeps_target() {
        let t = TestLifecycle::new();
        let ticket = t
            .lifecycle
            .tickets()
            .create(&fixtures::reporter(), NewTicket::new("VPN", ""), None)
            .unwrap();
        let tech = fixtures::technician();

        t.lifecycle
            .tickets()
            .update_status(&tech, &ticket.id, TicketStatus::WaitingParts, None)
            .unwrap();
        let updated = t
            .lifecycle
            .tickets()
            .update_status(&tech, &ticket.id, TicketStatus::Resolved, Some(tech.id.clone()))
            .unwrap();
        assert_eq!(updated.status, TicketStatus::Resolved);
    }

    #[test]
    fn test_resolved_and_closed_timestamps_set_once() {
        let t = TestLifecycle::new();
        let ticket = t
            .lifecycle
            .tickets()
            .create(&fixtures::reporter(), NewTicket::new("Printer", ""), None)
            .unwrap();
        let tech = fixtures::technician();
        let tickets = t.lifecycle.tickets();

        let resolved = tickets
            .update_status(&tech, &ticket.id, TicketStatus::Resolved, None)
            .unwrap();
        let first_resolved = resolved.resolved_at.unwrap();

        tickets
            .update_status(&tech, &ticket.id, TicketStatus::Open, None)
            .unwrap();
        let again = tickets
            .update_status(&tech, &ticket.id, TicketStatus::Resolved, None)
            .unwrap();
        assert_eq!(again.resolved_at, Some(first_resolved));
        assert_eq!(again.closed_at, None);

        let closed = tickets
            .update_status(&tech, &ticket.id, TicketStatus::Closed, None)
            .unwrap();
        let first_closed = closed.closed_at.unwrap();
        let reclosed = tickets
            .update_status(&tech, &ticket.id, TicketStatus::Closed, None)
            .unwrap();
        assert_eq!(reclosed.closed_at, Some(first_closed));
    }

    #[test]
    fn test_resolving_only_ticket_frees_asset() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        let ticket = t.open_ticket(&asset.id);
        let tech = fixtures::technician();

        t.lifecycle
            .tickets()
            .update_status(&tech, &ticket.id, TicketStatus::InProgress, None)
            .unwrap();
        assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);

        t.lifecycle
            .tickets()
            .update_status(&tech, &ticket.id, TicketStatus::Resolved, None)
            .unwrap();
        assert_eq!(t.asset_status(&asset.id), AssetStatus::InStock);
    }

    #[test]
    fn test_second_open_ticket_keeps_asset_under_repair() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        let first = t.open_ticket(&asset.id);
        let _second = t.open_ticket(&asset.id);
        let tech = fixtures::technician();

        t.lifecycle
            .tickets()
            .update_status(&tech, &first.id, TicketStatus::InProgress, None)
            .unwrap();
        t.lifecycle
            .tickets()
            .update_status(&tech, &first.id, TicketStatus::Resolved, None)
            .unwrap();

        assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);
    }

    #[test]
    fn test_update_status_unknown_ticket() {
        let t = TestLifecycle::new();
        let err = t
            .lifecycle
            .tickets()
            .update_status(&fixtures::technician(), "t-404", TicketStatus::Closed, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_comment_permissions() {
        let t = TestLifecycle::with_role_table();
        let ticket = t
            .lifecycle
            .tickets()
            .create(&fixtures::reporter(), NewTicket::new("Dock", ""), None)
            .unwrap();
        let tickets = t.lifecycle.tickets();

        // Reporter may comment without the update grant.
        let comment = tickets
            .add_comment(&fixtures::reporter(), &ticket.id, "  still broken  ")
            .unwrap();
        assert_eq!(comment.text, "still broken");

        // Technicians hold the update grant.
        tickets
            .add_comment(&fixtures::technician(), &ticket.id, "ordered a part")
            .unwrap();

        // A stranger with no grant is refused.
        let err = tickets
            .add_comment(&fixtures::employee(), &ticket.id, "me too")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = tickets
            .add_comment(&fixtures::reporter(), &ticket.id, "   ")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let fetched = tickets.get(&ticket.id).unwrap();
        let texts: Vec<_> = fetched.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["still broken", "ordered a part"]);
    }

    #[test]
    fn test_list_by_asset() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        t.open_ticket(&asset.id);
        t.lifecycle
            .tickets()
            .create(&fixtures::reporter(), NewTicket::new("Other", ""), None)
            .unwrap();

        let filter = TicketFilter::new().with_asset(asset.id.clone());
        assert_eq!(t.lifecycle.tickets().list(&filter).unwrap().len(), 1);
        assert_eq!(t.lifecycle.tickets().count(&TicketFilter::new()).unwrap(), 2);
    }
}
