//! Issuance ledger: checkout and return of assets.

use std::sync::Arc;

use super::{Checkout, Issuance, IssuanceFilter, IssuanceStatus, IssuanceStore, ReturnAsset};
use crate::access::{authorize, AccessControl, Action, Actor, Resource};
use crate::asset::AssetStatus;
use crate::db;
use crate::directory::{self, Directory};
use crate::error::{EntityKind, LifecycleError, Result};
use crate::events::{LifecycleEvent, NotificationService};
use crate::metrics;
use crate::sync::LifecycleSynchronizer;
use crate::ticket::{NewTicket, TicketPriority, TicketWorkflow};

pub struct IssuanceLedger {
    store: Arc<dyn IssuanceStore>,
    synchronizer: Arc<LifecycleSynchronizer>,
    access: Arc<dyn AccessControl>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn NotificationService>,
    /// Files a ticket when an asset comes back damaged.
    intake: Option<Arc<TicketWorkflow>>,
}

impl IssuanceLedger {
    pub fn new(
        store: Arc<dyn IssuanceStore>,
        synchronizer: Arc<LifecycleSynchronizer>,
        access: Arc<dyn AccessControl>,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            store,
            synchronizer,
            access,
            directory,
            notifier,
            intake: None,
        }
    }

    /// Open a ticket for every return in damaged or needs_repair condition.
    pub fn with_ticket_intake(mut self, tickets: Arc<TicketWorkflow>) -> Self {
        self.intake = Some(tickets);
        self
    }

    /// Issue an in-stock asset to an employee or department.
    pub fn checkout(&self, actor: &Actor, request: Checkout) -> Result<Issuance> {
        let result = self.checkout_inner(actor, request);
        metrics::record_operation("issuance", "checkout", &result);
        result
    }

    fn checkout_inner(&self, actor: &Actor, request: Checkout) -> Result<Issuance> {
        authorize(self.access.as_ref(), actor, Resource::Issuance, Action::Create)?;
        directory::require(
            self.directory.as_ref(),
            request.recipient.directory_kind(),
            request.recipient.id(),
        )?;

        let now = db::now();
        if let Some(expected) = request.expected_return {
            if expected < now {
                return Err(LifecycleError::validation(format!(
                    "Expected return {} is in the past",
                    db::format_timestamp(&expected)
                )));
            }
        }

        let registry = self.synchronizer.registry();
        registry.find(&request.asset_id)?;

        registry.locks().with(&request.asset_id, || -> Result<Issuance> {
            let asset = registry.find(&request.asset_id)?;
            if asset.status != AssetStatus::InStock {
                return Err(LifecycleError::AssetUnavailable {
                    asset_id: asset.id,
                    status: asset.status,
                });
            }
            if let Some(active) = self.store.active_for_asset(&asset.id)? {
                tracing::warn!(
                    asset_id = %asset.id,
                    issuance_id = %active.id,
                    "In-stock asset still has an active issuance"
                );
                return Err(LifecycleError::AssetUnavailable {
                    asset_id: asset.id,
                    status: asset.status,
                });
            }

            let issuance = Issuance {
                id: uuid::Uuid::new_v4().to_string(),
                asset_id: asset.id.clone(),
                recipient: request.recipient.clone(),
                issued_by: actor.id.clone(),
                issued_at: now,
                expected_return: request.expected_return,
                status: IssuanceStatus::Active,
                return_condition: None,
                returned_at: None,
                received_by: None,
                remarks: request.remarks.clone(),
            };
            self.store.insert(&issuance)?;

            let reason = format!("issued to {}", issuance.recipient);
            if let Err(e) = registry.apply_status(&asset.id, AssetStatus::Issued, &reason, actor) {
                tracing::error!(
                    issuance_id = %issuance.id,
                    asset_id = %asset.id,
                    error = %e,
                    "Failed to mark asset issued"
                );
            }

            tracing::info!(
                issuance_id = %issuance.id,
                asset_id = %issuance.asset_id,
                recipient = %issuance.recipient,
                "Asset checked out"
            );
            self.notifier.notify(LifecycleEvent::AssetCheckedOut {
                issuance_id: issuance.id.clone(),
                asset_id: issuance.asset_id.clone(),
                recipient: issuance.recipient.clone(),
                issued_by: issuance.issued_by.clone(),
            });

            Ok(issuance)
        })
    }

    /// Take an issued asset back and let the synchronizer settle its status.
    pub fn return_asset(
        &self,
        actor: &Actor,
        issuance_id: &str,
        request: ReturnAsset,
    ) -> Result<Issuance> {
        let result = self.return_asset_inner(actor, issuance_id, request);
        metrics::record_operation("issuance", "return", &result);
        result
    }

    fn return_asset_inner(
        &self,
        actor: &Actor,
        issuance_id: &str,
        request: ReturnAsset,
    ) -> Result<Issuance> {
        authorize(self.access.as_ref(), actor, Resource::Issuance, Action::Update)?;

        let issuance = self.get(issuance_id)?;
        let registry = self.synchronizer.registry();

        registry.locks().with(&issuance.asset_id, || -> Result<Issuance> {
            let mut issuance = self.get(issuance_id)?;
            if issuance.status != IssuanceStatus::Active {
                return Err(LifecycleError::invalid_state(
                    EntityKind::Issuance,
                    &issuance.id,
                    issuance.status,
                    "return",
                ));
            }

            issuance.status = IssuanceStatus::Returned;
            issuance.return_condition = Some(request.condition);
            issuance.returned_at = Some(db::now());
            issuance.received_by = Some(actor.id.clone());
            if request.remarks.is_some() {
                issuance.remarks = request.remarks.clone();
            }
            self.store.update(&issuance)?;

            tracing::info!(
                issuance_id = %issuance.id,
                asset_id = %issuance.asset_id,
                condition = %request.condition,
                "Asset returned"
            );
            self.notifier.notify(LifecycleEvent::AssetReturned {
                issuance_id: issuance.id.clone(),
                asset_id: issuance.asset_id.clone(),
                condition: request.condition,
                received_by: actor.id.clone(),
            });

            if request.condition.needs_attention() {
                self.file_intake_ticket(&issuance, actor);
            }

            let reason = format!("returned {}", request.condition);
            if let Err(e) = self.synchronizer.synchronize(
                &issuance.asset_id,
                Some(request.condition.intended_status()),
                &reason,
                actor,
            ) {
                tracing::error!(
                    issuance_id = %issuance.id,
                    asset_id = %issuance.asset_id,
                    error = %e,
                    "Failed to synchronize asset after return"
                );
            }

            Ok(issuance)
        })
    }

    pub fn get(&self, issuance_id: &str) -> Result<Issuance> {
        self.store
            .get(issuance_id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Issuance, issuance_id))
    }

    /// The asset's active issuance, if any.
    pub fn active_for_asset(&self, asset_id: &str) -> Result<Option<Issuance>> {
        self.synchronizer.registry().find(asset_id)?;
        Ok(self.store.active_for_asset(asset_id)?)
    }

    pub fn list(&self, filter: &IssuanceFilter) -> Result<Vec<Issuance>> {
        Ok(self.store.list(filter)?)
    }

    pub fn count(&self, filter: &IssuanceFilter) -> Result<i64> {
        Ok(self.store.count(filter)?)
    }

    fn file_intake_ticket(&self, issuance: &Issuance, actor: &Actor) {
        let Some(tickets) = &self.intake else {
            return;
        };
        let condition = issuance
            .return_condition
            .map(|c| c.to_string())
            .unwrap_or_default();
        let mut description = format!(
            "Returned by {} in condition {}.",
            issuance.recipient, condition
        );
        if let Some(remarks) = &issuance.remarks {
            description.push(' ');
            description.push_str(remarks);
        }
        let new = NewTicket::new(format!("Inspect returned asset ({condition})"), description)
            .with_priority(TicketPriority::High);

        match tickets.file_for_asset(&actor.id, new, &issuance.asset_id) {
            Ok(ticket) => tracing::info!(
                ticket_id = %ticket.id,
                issuance_id = %issuance.id,
                "Filed intake ticket for returned asset"
            ),
            Err(e) => tracing::error!(
                issuance_id = %issuance.id,
                error = %e,
                "Failed to file intake ticket"
            ),
        }
    }
}
