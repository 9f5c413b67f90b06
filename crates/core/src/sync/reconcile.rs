//! Reconciliation pass: repairs state left behind by interrupted workflows.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use super::LifecycleSynchronizer;
use crate::access::Actor;
use crate::error::Result;
use crate::events::{LifecycleEvent, NotificationService};
use crate::issuance::IssuanceStore;
use crate::metrics::RECONCILE_REPAIRS;
use crate::repair::RepairStore;
use crate::ticket::{TicketStatus, TicketStore, TicketWorkflow};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub assets_checked: u32,
    /// Assets whose status was corrected.
    pub assets_changed: u32,
    /// Tickets moved to match their repair.
    pub tickets_repaired: u32,
    /// Assets that could not be reconciled; see the logs.
    pub assets_failed: u32,
}

pub struct Reconciler {
    synchronizer: Arc<LifecycleSynchronizer>,
    tickets: Arc<TicketWorkflow>,
    ticket_store: Arc<dyn TicketStore>,
    repairs: Arc<dyn RepairStore>,
    issuances: Arc<dyn IssuanceStore>,
    notifier: Arc<dyn NotificationService>,
}

impl Reconciler {
    pub fn new(
        synchronizer: Arc<LifecycleSynchronizer>,
        tickets: Arc<TicketWorkflow>,
        ticket_store: Arc<dyn TicketStore>,
        repairs: Arc<dyn RepairStore>,
        issuances: Arc<dyn IssuanceStore>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            synchronizer,
            tickets,
            ticket_store,
            repairs,
            issuances,
            notifier,
        }
    }

    /// Reconcile every asset referenced by a pending repair, an active
    /// issuance or an open ticket. Running it twice changes nothing the
    /// second time.
    pub fn run(&self) -> Result<ReconcileReport> {
        let mut candidates: BTreeSet<String> = self
            .repairs
            .pending()?
            .into_iter()
            .map(|r| r.asset_id)
            .collect();
        candidates.extend(self.issuances.assets_with_active_issuance()?);
        candidates.extend(self.ticket_store.assets_with_open_tickets()?);

        let actor = Actor::system();
        let mut report = ReconcileReport::default();

        for asset_id in &candidates {
            report.assets_checked += 1;
            let outcome = self
                .synchronizer
                .registry()
                .locks()
                .with(asset_id, || self.reconcile_asset(asset_id, &actor));

            match outcome {
                Ok((tickets_repaired, changed)) => {
                    report.tickets_repaired += tickets_repaired;
                    if changed {
                        report.assets_changed += 1;
                    }
                }
                Err(e) => {
                    report.assets_failed += 1;
                    tracing::error!(asset_id = %asset_id, error = %e, "Failed to reconcile asset");
                }
            }
        }

        tracing::info!(
            assets_checked = report.assets_checked,
            assets_changed = report.assets_changed,
            tickets_repaired = report.tickets_repaired,
            assets_failed = report.assets_failed,
            "Reconciliation completed"
        );
        self.notifier.notify(LifecycleEvent::ReconciliationCompleted {
            assets_checked: report.assets_checked,
            assets_changed: report.assets_changed,
            tickets_repaired: report.tickets_repaired,
        });

        Ok(report)
    }

    /// Returns the number of tickets moved and whether the asset status changed.
    fn reconcile_asset(&self, asset_id: &str, actor: &Actor) -> Result<(u32, bool)> {
        let mut tickets_repaired = 0;

        // A repair was opened but its ticket never left open.
        if let Some(repair) = self.repairs.latest_for_asset(asset_id)? {
            if repair.is_pending() {
                // A pending repair whose ticket lost its asset link.
                let linked = self.tickets.with_ticket_lock(&repair.ticket_id, || -> Result<bool> {
                    let mut ticket = self.tickets.get(&repair.ticket_id)?;
                    if ticket.asset_id.is_some() {
                        return Ok(false);
                    }
                    tracing::warn!(
                        ticket_id = %ticket.id,
                        repair_id = %repair.id,
                        "Ticket under a pending repair has no asset"
                    );
                    self.tickets.link_asset(&mut ticket, asset_id)?;
                    Ok(true)
                })?;
                if linked {
                    RECONCILE_REPAIRS.with_label_values(&["ticket_linked"]).inc();
                    tickets_repaired += 1;
                }

                let ticket = self.tickets.get(&repair.ticket_id)?;
                if ticket.status == TicketStatus::Open {
                    tracing::warn!(
                        ticket_id = %ticket.id,
                        repair_id = %repair.id,
                        "Ticket left open under a pending repair"
                    );
                    self.tickets
                        .transition_locked(ticket, TicketStatus::InProgress, None, actor)?;
                    RECONCILE_REPAIRS
                        .with_label_values(&["ticket_in_progress"])
                        .inc();
                    tickets_repaired += 1;
                }
            }
        }

        // A repair finished but its ticket was never moved on.
        for ticket in self.ticket_store.open_for_asset(asset_id)? {
            let Some(repair) = self.repairs.latest_for_ticket(&ticket.id)? else {
                continue;
            };
            let Some(finished_at) = repair.finished_at() else {
                continue;
            };
            if finished_at <= ticket.updated_at {
                continue;
            }

            let (target, kind) = if repair.returned_to_user {
                (TicketStatus::Closed, "ticket_closed")
            } else {
                (TicketStatus::Resolved, "ticket_resolved")
            };
            tracing::warn!(
                ticket_id = %ticket.id,
                repair_id = %repair.id,
                to = %target,
                "Ticket behind its finished repair"
            );
            self.tickets.transition_locked(ticket, target, None, actor)?;
            RECONCILE_REPAIRS.with_label_values(&[kind]).inc();
            tickets_repaired += 1;
        }

        let before = self.synchronizer.registry().find(asset_id)?.status;
        let after = self
            .synchronizer
            .synchronize(asset_id, None, "reconciliation", actor)?
            .status;
        let changed = before != after;
        if changed {
            tracing::warn!(asset_id, from = %before, to = %after, "Corrected asset status");
            RECONCILE_REPAIRS.with_label_values(&["asset_status"]).inc();
        }

        Ok((tickets_repaired, changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetStatus;
    use crate::db;
    use crate::issuance::{Issuance, IssuanceStatus, Recipient};
    use crate::repair::{RepairOutcome, RepairRecord};
    use crate::testing::{fixtures, TestLifecycle};

    fn pending_repair(ticket_id: &str, asset_id: &str) -> RepairRecord {
        RepairRecord {
            id: uuid::Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            asset_id: asset_id.to_string(),
            technician_id: fixtures::technician().id,
            diagnosis: None,
            outcome: RepairOutcome::Pending,
            actions_taken: None,
            parts_used: None,
            returned_to_user: false,
            received_at: db::now(),
            completed_at: None,
            returned_at: None,
        }
    }

    #[test]
    fn test_nothing_to_do() {
        let t = TestLifecycle::new();
        t.register_asset("LT-0001");

        let report = t.lifecycle.reconciler().run().unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert!(t
            .notifier
            .event_types()
            .contains(&"reconciliation_completed"));
    }

    #[test]
    fn test_interrupted_open_repair() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        let ticket = t.open_ticket(&asset.id);
        // Repair stored, but the ticket and asset steps never ran.
        t.stores
            .repairs
            .insert(&pending_repair(&ticket.id, &asset.id))
            .unwrap();

        let report = t.lifecycle.reconciler().run().unwrap();
        assert_eq!(report.assets_checked, 1);
        assert_eq!(report.tickets_repaired, 1);
        assert_eq!(report.assets_changed, 1);
        assert_eq!(
            t.lifecycle.tickets().get(&ticket.id).unwrap().status,
            TicketStatus::InProgress
        );
        assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);

        let again = t.lifecycle.reconciler().run().unwrap();
        assert_eq!(again.tickets_repaired, 0);
        assert_eq!(again.assets_changed, 0);
    }

    #[test]
    fn test_pending_repair_relinks_ticket() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        let ticket = t
            .lifecycle
            .tickets()
            .create(&fixtures::reporter(), fixtures::hinge_ticket(), None)
            .unwrap();
        t.lifecycle
            .tickets()
            .update_status(&fixtures::technician(), &ticket.id, TicketStatus::WaitingParts, None)
            .unwrap();
        t.stores
            .repairs
            .insert(&pending_repair(&ticket.id, &asset.id))
            .unwrap();

        let report = t.lifecycle.reconciler().run().unwrap();
        assert_eq!(report.tickets_repaired, 1);
        assert_eq!(report.assets_changed, 1);

        let ticket = t.lifecycle.tickets().get(&ticket.id).unwrap();
        assert_eq!(ticket.asset_id.as_deref(), Some(asset.id.as_str()));
        assert_eq!(ticket.status, TicketStatus::WaitingParts);
        assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);
    }

    #[test]
    fn test_interrupted_completion() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        let ticket = t.open_ticket(&asset.id);
        let repair = t.open_repair(&ticket.id, &asset.id);

        // Outcome stored, ticket never resolved.
        let mut done = t.lifecycle.repairs().get(&repair.id).unwrap();
        done.outcome = RepairOutcome::BeyondRepair;
        done.completed_at = Some(db::now() + chrono::Duration::seconds(1));
        t.stores.repairs.update(&done).unwrap();

        let report = t.lifecycle.reconciler().run().unwrap();
        assert_eq!(report.tickets_repaired, 1);
        assert_eq!(
            t.lifecycle.tickets().get(&ticket.id).unwrap().status,
            TicketStatus::Resolved
        );
        assert_eq!(t.asset_status(&asset.id), AssetStatus::BeyondRepair);
    }

    #[test]
    fn test_interrupted_checkout() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        let issuance = Issuance {
            id: uuid::Uuid::new_v4().to_string(),
            asset_id: asset.id.clone(),
            recipient: Recipient::Employee(fixtures::EMPLOYEE_ID.to_string()),
            issued_by: fixtures::clerk().id,
            issued_at: db::now(),
            expected_return: None,
            status: IssuanceStatus::Active,
            return_condition: None,
            returned_at: None,
            received_by: None,
            remarks: None,
        };
        t.stores.issuances.insert(&issuance).unwrap();

        let report = t.lifecycle.reconciler().run().unwrap();
        assert_eq!(report.assets_changed, 1);
        assert_eq!(t.asset_status(&asset.id), AssetStatus::Issued);
    }

    #[test]
    fn test_reopened_ticket_is_left_alone() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        let ticket = t.open_ticket(&asset.id);
        let repair = t.open_repair(&ticket.id, &asset.id);
        let tech = fixtures::technician();
        t.lifecycle
            .repairs()
            .complete(
                &tech,
                &repair.id,
                crate::repair::CompleteRepair {
                    outcome: crate::repair::CompletionOutcome::Fixed,
                    actions_taken: "Reseated RAM".to_string(),
                    parts_used: None,
                },
            )
            .unwrap();
        // Problem came back after the repair.
        t.lifecycle
            .tickets()
            .update_status(&tech, &ticket.id, TicketStatus::Open, None)
            .unwrap();

        let report = t.lifecycle.reconciler().run().unwrap();
        assert_eq!(report.tickets_repaired, 0);
        assert_eq!(
            t.lifecycle.tickets().get(&ticket.id).unwrap().status,
            TicketStatus::Open
        );
        assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);
    }
}
