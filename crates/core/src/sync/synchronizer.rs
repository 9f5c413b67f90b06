//! Funnel through which every workflow settles an asset's status.

use std::sync::Arc;

use super::{resolve, Resolution, WorkflowSnapshot};
use crate::access::Actor;
use crate::asset::{Asset, AssetRegistry, AssetStatus};
use crate::error::Result;
use crate::issuance::IssuanceStore;
use crate::repair::RepairStore;
use crate::ticket::TicketStore;

/// Gathers the workflows referencing an asset and applies the resolved status.
pub struct LifecycleSynchronizer {
    registry: Arc<AssetRegistry>,
    tickets: Arc<dyn TicketStore>,
    repairs: Arc<dyn RepairStore>,
    issuances: Arc<dyn IssuanceStore>,
}

impl LifecycleSynchronizer {
    pub fn new(
        registry: Arc<AssetRegistry>,
        tickets: Arc<dyn TicketStore>,
        repairs: Arc<dyn RepairStore>,
        issuances: Arc<dyn IssuanceStore>,
    ) -> Self {
        Self {
            registry,
            tickets,
            repairs,
            issuances,
        }
    }

    pub fn registry(&self) -> &Arc<AssetRegistry> {
        &self.registry
    }

    /// Every active workflow referencing the asset.
    pub fn snapshot(&self, asset_id: &str) -> Result<WorkflowSnapshot> {
        Ok(WorkflowSnapshot {
            open_tickets: self.tickets.open_for_asset(asset_id)?,
            latest_repair: self.repairs.latest_for_asset(asset_id)?,
            active_issuance: self.issuances.active_for_asset(asset_id)?,
        })
    }

    /// Compute the status the asset should be in, without changing anything.
    pub fn resolve_asset_status(
        &self,
        asset_id: &str,
        intent: Option<AssetStatus>,
    ) -> Result<Resolution> {
        let asset = self.registry.find(asset_id)?;
        let snapshot = self.snapshot(asset_id)?;
        Ok(resolve(asset.status, &snapshot, intent))
    }

    /// Resolve and apply. The caller holds the asset lock.
    pub(crate) fn synchronize(
        &self,
        asset_id: &str,
        intent: Option<AssetStatus>,
        reason: &str,
        actor: &Actor,
    ) -> Result<Asset> {
        let asset = self.registry.find(asset_id)?;
        let snapshot = self.snapshot(asset_id)?;

        match resolve(asset.status, &snapshot, intent) {
            Resolution::Target(target) if target != asset.status => {
                tracing::debug!(
                    asset_id,
                    from = %asset.status,
                    to = %target,
                    open_tickets = snapshot.open_tickets.len(),
                    issued = snapshot.active_issuance.is_some(),
                    "Resolved asset status"
                );
                self.registry.apply_route(asset_id, target, reason, actor)
            }
            _ => Ok(asset),
        }
    }

    /// Resolve and apply under the asset lock.
    pub fn synchronize_asset(&self, actor: &Actor, asset_id: &str, reason: &str) -> Result<Asset> {
        self.registry
            .locks()
            .with(asset_id, || self.synchronize(asset_id, None, reason, actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{fixtures, TestLifecycle};
    use crate::ticket::TicketStatus;

    #[test]
    fn test_resolve_does_not_mutate() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        t.open_ticket(&asset.id);

        let resolution = t
            .lifecycle
            .synchronizer()
            .resolve_asset_status(&asset.id, None)
            .unwrap();
        assert_eq!(resolution, Resolution::Target(AssetStatus::UnderRepair));
        assert_eq!(t.asset_status(&asset.id), AssetStatus::InStock);
    }

    #[test]
    fn test_synchronize_asset_applies_resolution() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        t.open_ticket(&asset.id);

        let synced = t
            .lifecycle
            .synchronizer()
            .synchronize_asset(&fixtures::admin(), &asset.id, "manual resync")
            .unwrap();
        assert_eq!(synced.status, AssetStatus::UnderRepair);
    }

    #[test]
    fn test_snapshot_collects_open_tickets_only() {
        let t = TestLifecycle::new();
        let asset = t.register_asset("LT-0001");
        let first = t.open_ticket(&asset.id);
        t.open_ticket(&asset.id);
        t.lifecycle
            .tickets()
            .update_status(&fixtures::technician(), &first.id, TicketStatus::Closed, None)
            .unwrap();

        let snapshot = t.lifecycle.synchronizer().snapshot(&asset.id).unwrap();
        assert_eq!(snapshot.open_tickets.len(), 1);
        assert!(snapshot.latest_repair.is_none());
        assert!(snapshot.active_issuance.is_none());
    }

    #[test]
    fn test_resolve_unknown_asset() {
        let t = TestLifecycle::new();
        let err = t
            .lifecycle
            .synchronizer()
            .resolve_asset_status("missing", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
