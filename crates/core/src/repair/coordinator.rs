//! Repair coordinator: bridges a ticket to a physical repair and back.

use std::sync::Arc;

use super::{CompleteRepair, OpenRepair, RepairFilter, RepairOutcome, RepairRecord, RepairStore};
use crate::access::{authorize, AccessControl, Action, Actor, Resource};
use crate::asset::AssetStatus;
use crate::db;
use crate::directory::{self, Directory, DirectoryKind};
use crate::error::{EntityKind, LifecycleError, Result};
use crate::events::{LifecycleEvent, NotificationService};
use crate::metrics;
use crate::sync::LifecycleSynchronizer;
use crate::ticket::{TicketStatus, TicketWorkflow};

pub struct RepairCoordinator {
    store: Arc<dyn RepairStore>,
    tickets: Arc<TicketWorkflow>,
    synchronizer: Arc<LifecycleSynchronizer>,
    access: Arc<dyn AccessControl>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn NotificationService>,
}

impl RepairCoordinator {
    pub fn new(
        store: Arc<dyn RepairStore>,
        tickets: Arc<TicketWorkflow>,
        synchronizer: Arc<LifecycleSynchronizer>,
        access: Arc<dyn AccessControl>,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            store,
            tickets,
            synchronizer,
            access,
            directory,
            notifier,
        }
    }

    /// Take an asset in for repair against a ticket.
    ///
    /// The ticket moves to in_progress and the asset to under_repair.
    pub fn open_repair(&self, actor: &Actor, request: OpenRepair) -> Result<RepairRecord> {
        let result = self.open_repair_inner(actor, request);
        metrics::record_operation("repair", "open", &result);
        result
    }

    fn open_repair_inner(&self, actor: &Actor, request: OpenRepair) -> Result<RepairRecord> {
        authorize(self.access.as_ref(), actor, Resource::Repair, Action::Create)?;
        directory::require(
            self.directory.as_ref(),
            DirectoryKind::User,
            &request.technician_id,
        )?;

        let registry = self.synchronizer.registry();
        // Existence checks before locking give clean NotFound errors.
        self.tickets.get(&request.ticket_id)?;
        registry.find(&request.asset_id)?;

        registry.locks().with(&request.asset_id, || {
            self.tickets
                .with_ticket_lock(&request.ticket_id, || self.open_locked(actor, &request))
        })
    }

    /// Body of `open_repair`. Caller holds the asset lock, then the ticket lock.
    fn open_locked(&self, actor: &Actor, request: &OpenRepair) -> Result<RepairRecord> {
        let registry = self.synchronizer.registry();
        let mut ticket = self.tickets.get(&request.ticket_id)?;
        if !ticket.status.is_open_family() {
            return Err(LifecycleError::invalid_state(
                EntityKind::Ticket,
                &ticket.id,
                ticket.status,
                "open a repair for",
            ));
        }
        match ticket.asset_id.as_deref() {
            Some(linked) if linked != request.asset_id => {
                return Err(LifecycleError::validation(format!(
                    "Ticket {} concerns asset {}, not {}",
                    ticket.id, linked, request.asset_id
                )));
            }
            _ => {}
        }
        if let Some(existing) = self.store.latest_for_ticket(&ticket.id)? {
            if existing.is_pending() {
                return Err(LifecycleError::invalid_state(
                    EntityKind::Ticket,
                    &ticket.id,
                    format!("repair {} pending", existing.id),
                    "open a second repair for",
                ));
            }
        }

        let asset = registry.find(&request.asset_id)?;
        if asset.status.route_to(AssetStatus::UnderRepair).is_none() {
            return Err(LifecycleError::InvalidTransition {
                asset_id: asset.id,
                from: asset.status,
                to: AssetStatus::UnderRepair,
            });
        }

        self.tickets.link_asset(&mut ticket, &asset.id)?;

        let record = RepairRecord {
            id: uuid::Uuid::new_v4().to_string(),
            ticket_id: ticket.id.clone(),
            asset_id: asset.id.clone(),
            technician_id: request.technician_id.clone(),
            diagnosis: request.diagnosis.clone().filter(|d| !d.trim().is_empty()),
            outcome: RepairOutcome::Pending,
            actions_taken: None,
            parts_used: None,
            returned_to_user: false,
            received_at: db::now(),
            completed_at: None,
            returned_at: None,
        };
        self.store.insert(&record)?;

        tracing::info!(
            repair_id = %record.id,
            ticket_id = %record.ticket_id,
            asset_id = %record.asset_id,
            technician = %record.technician_id,
            "Repair opened"
        );
        self.notifier.notify(LifecycleEvent::RepairOpened {
            repair_id: record.id.clone(),
            ticket_id: record.ticket_id.clone(),
            asset_id: record.asset_id.clone(),
            technician_id: record.technician_id.clone(),
        });

        self.settle(
            |coordinator| {
                coordinator
                    .tickets
                    .transition_locked(ticket, TicketStatus::InProgress, None, actor)
                    .map(|_| ())
            },
            &record,
            "repair opened",
            actor,
        );

        Ok(record)
    }

    /// Record or replace the diagnosis of a pending repair.
    pub fn record_diagnosis(
        &self,
        actor: &Actor,
        repair_id: &str,
        diagnosis: &str,
    ) -> Result<RepairRecord> {
        let result = self.record_diagnosis_inner(actor, repair_id, diagnosis);
        metrics::record_operation("repair", "diagnose", &result);
        result
    }

    fn record_diagnosis_inner(
        &self,
        actor: &Actor,
        repair_id: &str,
        diagnosis: &str,
    ) -> Result<RepairRecord> {
        authorize(self.access.as_ref(), actor, Resource::Repair, Action::Update)?;
        let diagnosis = diagnosis.trim();
        if diagnosis.is_empty() {
            return Err(LifecycleError::validation("Diagnosis text is required"));
        }

        let record = self.get(repair_id)?;
        self.synchronizer
            .registry()
            .locks()
            .with(&record.asset_id, || -> Result<RepairRecord> {
                let mut record = self.get(repair_id)?;
                if !record.is_pending() {
                    return Err(LifecycleError::invalid_state(
                        EntityKind::Repair,
                        &record.id,
                        record.outcome,
                        "diagnose",
                    ));
                }
                record.diagnosis = Some(diagnosis.to_string());
                self.store.update(&record)?;

                self.notifier.notify(LifecycleEvent::RepairDiagnosed {
                    repair_id: record.id.clone(),
                    ticket_id: record.ticket_id.clone(),
                    actor_id: actor.id.clone(),
                });
                Ok(record)
            })
    }

    /// Record the final outcome, resolve the ticket and settle the asset.
    pub fn complete(
        &self,
        actor: &Actor,
        repair_id: &str,
        request: CompleteRepair,
    ) -> Result<RepairRecord> {
        let result = self.complete_inner(actor, repair_id, request);
        metrics::record_operation("repair", "complete", &result);
        result
    }

    fn complete_inner(
        &self,
        actor: &Actor,
        repair_id: &str,
        request: CompleteRepair,
    ) -> Result<RepairRecord> {
        authorize(self.access.as_ref(), actor, Resource::Repair, Action::Update)?;
        if request.actions_taken.trim().is_empty() {
            return Err(LifecycleError::validation("Actions taken are required"));
        }

        let record = self.get(repair_id)?;
        self.synchronizer
            .registry()
            .locks()
            .with(&record.asset_id, || -> Result<RepairRecord> {
                let mut record = self.get(repair_id)?;
                if !record.is_pending() {
                    return Err(LifecycleError::invalid_state(
                        EntityKind::Repair,
                        &record.id,
                        record.outcome,
                        "complete",
                    ));
                }

                record.outcome = request.outcome.into();
                record.actions_taken = Some(request.actions_taken.trim().to_string());
                record.parts_used = request.parts_used.clone();
                record.completed_at = Some(db::now());
                self.store.update(&record)?;

                tracing::info!(
                    repair_id = %record.id,
                    outcome = %record.outcome,
                    "Repair completed"
                );
                self.notifier.notify(LifecycleEvent::RepairCompleted {
                    repair_id: record.id.clone(),
                    ticket_id: record.ticket_id.clone(),
                    asset_id: record.asset_id.clone(),
                    outcome: record.outcome,
                    actor_id: actor.id.clone(),
                });

                self.settle(
                    |coordinator| coordinator.move_ticket(&record.ticket_id, TicketStatus::Resolved, actor),
                    &record,
                    "repair completed",
                    actor,
                );

                Ok(record)
            })
    }

    /// Hand a fixed asset back to its user and close the ticket.
    pub fn mark_returned_to_user(&self, actor: &Actor, repair_id: &str) -> Result<RepairRecord> {
        let result = self.mark_returned_inner(actor, repair_id);
        metrics::record_operation("repair", "return", &result);
        result
    }

    fn mark_returned_inner(&self, actor: &Actor, repair_id: &str) -> Result<RepairRecord> {
        authorize(self.access.as_ref(), actor, Resource::Repair, Action::Update)?;

        let record = self.get(repair_id)?;
        self.synchronizer
            .registry()
            .locks()
            .with(&record.asset_id, || -> Result<RepairRecord> {
                let mut record = self.get(repair_id)?;
                if !record.awaiting_return() {
                    let current = if record.returned_to_user {
                        "already returned".to_string()
                    } else {
                        record.outcome.to_string()
                    };
                    return Err(LifecycleError::invalid_state(
                        EntityKind::Repair,
                        &record.id,
                        current,
                        "return",
                    ));
                }

                record.returned_to_user = true;
                record.returned_at = Some(db::now());
                self.store.update(&record)?;

                tracing::info!(repair_id = %record.id, "Repaired asset returned to user");
                self.notifier.notify(LifecycleEvent::RepairReturned {
                    repair_id: record.id.clone(),
                    ticket_id: record.ticket_id.clone(),
                    asset_id: record.asset_id.clone(),
                    actor_id: actor.id.clone(),
                });

                self.settle(
                    |coordinator| coordinator.move_ticket(&record.ticket_id, TicketStatus::Closed, actor),
                    &record,
                    "repair returned to user",
                    actor,
                );

                Ok(record)
            })
    }

    pub fn get(&self, repair_id: &str) -> Result<RepairRecord> {
        self.store
            .get(repair_id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Repair, repair_id))
    }

    pub fn list(&self, filter: &RepairFilter) -> Result<Vec<RepairRecord>> {
        Ok(self.store.list(filter)?)
    }

    pub fn count(&self, filter: &RepairFilter) -> Result<i64> {
        Ok(self.store.count(filter)?)
    }

    /// Move the repair's ticket forward. Resolving only applies to open
    /// tickets; closing applies to anything not already closed.
    fn move_ticket(&self, ticket_id: &str, target: TicketStatus, actor: &Actor) -> Result<()> {
        let ticket = self.tickets.get(ticket_id)?;
        let applies = match target {
            TicketStatus::Resolved => ticket.status.is_open_family(),
            TicketStatus::Closed => !ticket.status.is_closed(),
            _ => ticket.status != target,
        };
        if applies {
            self.tickets.transition_locked(ticket, target, None, actor)?;
        }
        Ok(())
    }

    /// Follow-up writes after the repair record is stored.
    ///
    /// The repair record is the committed fact; a failure here is logged and
    /// left for the reconciliation pass.
    fn settle(
        &self,
        ticket_step: impl FnOnce(&Self) -> Result<()>,
        record: &RepairRecord,
        reason: &str,
        actor: &Actor,
    ) {
        if let Err(e) = ticket_step(self) {
            tracing::error!(
                repair_id = %record.id,
                ticket_id = %record.ticket_id,
                error = %e,
                "Failed to update ticket after repair change"
            );
        }
        if let Err(e) = self
            .synchronizer
            .synchronize(&record.asset_id, None, reason, actor)
        {
            tracing::error!(
                repair_id = %record.id,
                asset_id = %record.asset_id,
                error = %e,
                "Failed to synchronize asset after repair change"
            );
        }
    }
}
