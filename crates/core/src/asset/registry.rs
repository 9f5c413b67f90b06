//! The asset registry: sole owner of asset records and their status.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::{Asset, AssetFilter, AssetStatus, AssetStore, NewAsset};
use crate::access::{authorize, AccessControl, Action, Actor, Resource};
use crate::db;
use crate::directory::{self, Directory, DirectoryKind};
use crate::error::{EntityKind, LifecycleError, Result};
use crate::events::{LifecycleEvent, NotificationService};
use crate::metrics::{self, ASSETS_REGISTERED, ASSET_STATUS_TRANSITIONS, TRANSITIONS_REJECTED};
use crate::sync::AssetLocks;

static BARCODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{3,64}$").unwrap());

/// Whether a barcode is well formed.
pub fn is_valid_barcode(barcode: &str) -> bool {
    BARCODE_PATTERN.is_match(barcode)
}

/// Registers assets and applies status changes through the transition table.
pub struct AssetRegistry {
    store: Arc<dyn AssetStore>,
    access: Arc<dyn AccessControl>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn NotificationService>,
    locks: Arc<AssetLocks>,
}

impl AssetRegistry {
    pub fn new(
        store: Arc<dyn AssetStore>,
        access: Arc<dyn AccessControl>,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn NotificationService>,
        locks: Arc<AssetLocks>,
    ) -> Self {
        Self {
            store,
            access,
            directory,
            notifier,
            locks,
        }
    }

    /// Register a new asset in stock.
    pub fn register(&self, actor: &Actor, new: NewAsset) -> Result<Asset> {
        let result = self.register_inner(actor, new);
        metrics::record_operation("asset", "register", &result);
        result
    }

    fn register_inner(&self, actor: &Actor, new: NewAsset) -> Result<Asset> {
        authorize(self.access.as_ref(), actor, Resource::Asset, Action::Create)?;

        let name = new.name.trim();
        if name.is_empty() {
            return Err(LifecycleError::validation("Asset name is required"));
        }
        let barcode = new.barcode.trim();
        if !is_valid_barcode(barcode) {
            return Err(LifecycleError::validation(format!(
                "Malformed barcode: {:?}",
                new.barcode
            )));
        }
        directory::require(self.directory.as_ref(), DirectoryKind::Category, &new.category_id)?;
        directory::require(
            self.directory.as_ref(),
            DirectoryKind::Department,
            &new.department_id,
        )?;

        if self.store.get_by_barcode(barcode)?.is_some() {
            return Err(duplicate_barcode(barcode));
        }

        let now = db::now();
        let asset = Asset {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            barcode: barcode.to_string(),
            serial_number: new.serial_number,
            model: new.model,
            category_id: new.category_id,
            department_id: new.department_id,
            notes: new.notes,
            status: AssetStatus::InStock,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert(&asset) {
            // Lost a race with a concurrent registration of the same barcode.
            if self.store.get_by_barcode(barcode)?.is_some() {
                return Err(duplicate_barcode(barcode));
            }
            return Err(e.into());
        }

        ASSETS_REGISTERED.inc();
        tracing::info!(asset_id = %asset.id, barcode = %asset.barcode, "Asset registered");
        self.notifier.notify(LifecycleEvent::AssetRegistered {
            asset_id: asset.id.clone(),
            barcode: asset.barcode.clone(),
            name: asset.name.clone(),
            registered_by: actor.id.clone(),
        });

        Ok(asset)
    }

    /// Explicitly set an asset's status. Setting the current status is a no-op.
    pub fn set_status(
        &self,
        actor: &Actor,
        asset_id: &str,
        target: AssetStatus,
        reason: &str,
    ) -> Result<Asset> {
        let result = authorize(self.access.as_ref(), actor, Resource::Asset, Action::Update)
            .and_then(|()| {
                self.locks
                    .with(asset_id, || self.apply_status(asset_id, target, reason, actor))
            });
        metrics::record_operation("asset", "set_status", &result);
        result
    }

    /// Retire an asset permanently.
    pub fn dispose(&self, actor: &Actor, asset_id: &str, reason: &str) -> Result<Asset> {
        let result = authorize(self.access.as_ref(), actor, Resource::Asset, Action::Delete)
            .and_then(|()| {
                self.locks.with(asset_id, || {
                    self.apply_status(asset_id, AssetStatus::Disposed, reason, actor)
                })
            });
        metrics::record_operation("asset", "dispose", &result);
        result
    }

    pub fn find(&self, asset_id: &str) -> Result<Asset> {
        self.store
            .get(asset_id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Asset, asset_id))
    }

    pub fn find_by_barcode(&self, barcode: &str) -> Result<Asset> {
        self.store
            .get_by_barcode(barcode)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Asset, barcode))
    }

    pub fn list(&self, filter: &AssetFilter) -> Result<Vec<Asset>> {
        Ok(self.store.list(filter)?)
    }

    pub fn count(&self, filter: &AssetFilter) -> Result<i64> {
        Ok(self.store.count(filter)?)
    }

    pub(crate) fn locks(&self) -> &Arc<AssetLocks> {
        &self.locks
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn NotificationService> {
        &self.notifier
    }

    /// Apply one legal step. The caller holds the asset lock.
    pub(crate) fn apply_status(
        &self,
        asset_id: &str,
        target: AssetStatus,
        reason: &str,
        actor: &Actor,
    ) -> Result<Asset> {
        let asset = self.find(asset_id)?;
        if asset.status == target {
            return Ok(asset);
        }
        if !asset.status.can_transition_to(target) {
            return Err(self.reject(&asset, target));
        }
        self.write_status(asset, target, reason, actor)
    }

    /// Walk the shortest legal route to `target`. The caller holds the asset lock.
    ///
    /// Reachability is checked before the first write, so an unreachable
    /// target leaves the asset untouched.
    pub(crate) fn apply_route(
        &self,
        asset_id: &str,
        target: AssetStatus,
        reason: &str,
        actor: &Actor,
    ) -> Result<Asset> {
        let mut asset = self.find(asset_id)?;
        let route = asset
            .status
            .route_to(target)
            .ok_or_else(|| self.reject(&asset, target))?;

        metrics::SYNC_ROUTE_LENGTH
            .with_label_values(&[])
            .observe(route.len() as f64);

        for step in route {
            asset = self.write_status(asset, step, reason, actor)?;
        }
        Ok(asset)
    }

    fn write_status(
        &self,
        mut asset: Asset,
        target: AssetStatus,
        reason: &str,
        actor: &Actor,
    ) -> Result<Asset> {
        let from = asset.status;
        let now = db::now();
        self.store.update_status(&asset.id, target, now)?;
        asset.status = target;
        asset.updated_at = now;

        ASSET_STATUS_TRANSITIONS
            .with_label_values(&[from.as_str(), target.as_str()])
            .inc();
        tracing::info!(
            asset_id = %asset.id,
            from = %from,
            to = %target,
            reason,
            actor = %actor.id,
            "Asset status changed"
        );
        self.notifier.notify(LifecycleEvent::AssetStatusChanged {
            asset_id: asset.id.clone(),
            from_status: from,
            to_status: target,
            reason: reason.to_string(),
            actor_id: actor.id.clone(),
        });

        Ok(asset)
    }

    fn reject(&self, asset: &Asset, target: AssetStatus) -> LifecycleError {
        TRANSITIONS_REJECTED
            .with_label_values(&[asset.status.as_str(), target.as_str()])
            .inc();
        tracing::warn!(
            asset_id = %asset.id,
            from = %asset.status,
            to = %target,
            "Asset status transition rejected"
        );
        LifecycleError::InvalidTransition {
            asset_id: asset.id.clone(),
            from: asset.status,
            to: target,
        }
    }
}

fn duplicate_barcode(barcode: &str) -> LifecycleError {
    LifecycleError::validation(format!("Barcode already registered: {}", barcode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AllowAll, RoleTable};
    use crate::config::AccessGrant;
    use crate::asset::SqliteAssetStore;
    use crate::directory::StaticDirectory;
    use crate::error::ErrorKind;
    use crate::testing::RecordingNotifier;

    struct Fixture {
        registry: AssetRegistry,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture_with_access(access: Arc<dyn AccessControl>) -> Fixture {
        let directory = StaticDirectory::new()
            .with(DirectoryKind::Category, "laptops", "Laptops")
            .with(DirectoryKind::Department, "it", "IT");
        let notifier = Arc::new(RecordingNotifier::new());
        let registry = AssetRegistry::new(
            Arc::new(SqliteAssetStore::in_memory().unwrap()),
            access,
            Arc::new(directory),
            notifier.clone(),
            Arc::new(AssetLocks::new()),
        );
        Fixture { registry, notifier }
    }

    fn fixture() -> Fixture {
        fixture_with_access(Arc::new(AllowAll::new()))
    }

    fn admin() -> Actor {
        Actor::new("admin-1", "admin")
    }

    fn laptop(barcode: &str) -> NewAsset {
        NewAsset::new("ThinkPad T14", barcode, "laptops", "it")
    }

    #[test]
    fn test_register_starts_in_stock() {
        let f = fixture();
        let asset = f.registry.register(&admin(), laptop("LT-0001")).unwrap();

        assert_eq!(asset.status, AssetStatus::InStock);
        assert_eq!(f.registry.find(&asset.id).unwrap(), asset);
        assert_eq!(f.registry.find_by_barcode("LT-0001").unwrap().id, asset.id);
        assert_eq!(f.notifier.event_types(), vec!["asset_registered"]);
    }

    #[test]
    fn test_register_validation() {
        let f = fixture();

        let err = f
            .registry
            .register(&admin(), NewAsset::new("  ", "LT-0001", "laptops", "it"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let long = "x".repeat(65);
        for bad in ["ab", "has space", "way/too/slashy", long.as_str()] {
            let err = f.registry.register(&admin(), laptop(bad)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "barcode {:?}", bad);
        }

        let err = f
            .registry
            .register(&admin(), NewAsset::new("Desk", "DK-1", "furniture", "it"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: Unknown category: furniture");

        let err = f
            .registry
            .register(&admin(), NewAsset::new("Desk", "DK-2", "laptops", "hr"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_register_duplicate_barcode() {
        let f = fixture();
        f.registry.register(&admin(), laptop("LT-0001")).unwrap();
        let err = f.registry.register(&admin(), laptop("LT-0001")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_set_status_legal_and_noop() {
        let f = fixture();
        let asset = f.registry.register(&admin(), laptop("LT-0001")).unwrap();

        let updated = f
            .registry
            .set_status(&admin(), &asset.id, AssetStatus::UnderRepair, "inspection")
            .unwrap();
        assert_eq!(updated.status, AssetStatus::UnderRepair);

        let again = f
            .registry
            .set_status(&admin(), &asset.id, AssetStatus::UnderRepair, "inspection")
            .unwrap();
        assert_eq!(again.status, AssetStatus::UnderRepair);

        // Only the real change is announced.
        assert_eq!(
            f.notifier.event_types(),
            vec!["asset_registered", "asset_status_changed"]
        );
    }

    #[test]
    fn test_set_status_illegal_transition() {
        let f = fixture();
        let asset = f.registry.register(&admin(), laptop("LT-0001")).unwrap();

        let err = f
            .registry
            .set_status(&admin(), &asset.id, AssetStatus::BeyondRepair, "dropped")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(
            f.registry.find(&asset.id).unwrap().status,
            AssetStatus::InStock
        );
    }

    #[test]
    fn test_dispose_is_absorbing() {
        let f = fixture();
        let asset = f.registry.register(&admin(), laptop("LT-0001")).unwrap();

        let disposed = f.registry.dispose(&admin(), &asset.id, "end of life").unwrap();
        assert_eq!(disposed.status, AssetStatus::Disposed);

        for target in [AssetStatus::InStock, AssetStatus::Issued, AssetStatus::UnderRepair] {
            let err = f
                .registry
                .set_status(&admin(), &asset.id, target, "revive")
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        }
    }

    #[test]
    fn test_dispose_from_issued_rejected() {
        let f = fixture();
        let asset = f.registry.register(&admin(), laptop("LT-0001")).unwrap();
        f.registry
            .set_status(&admin(), &asset.id, AssetStatus::Issued, "manual")
            .unwrap();

        let err = f.registry.dispose(&admin(), &asset.id, "lost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_apply_route_emits_each_step() {
        let f = fixture();
        let asset = f.registry.register(&admin(), laptop("LT-0001")).unwrap();
        f.registry
            .set_status(&admin(), &asset.id, AssetStatus::Issued, "manual")
            .unwrap();

        let settled = f
            .registry
            .apply_route(&asset.id, AssetStatus::BeyondRepair, "repair failed", &admin())
            .unwrap();
        assert_eq!(settled.status, AssetStatus::BeyondRepair);

        let changes: Vec<_> = f
            .notifier
            .events()
            .into_iter()
            .filter_map(|e| match e {
                LifecycleEvent::AssetStatusChanged {
                    from_status,
                    to_status,
                    ..
                } => Some((from_status, to_status)),
                _ => None,
            })
            .collect();
        assert_eq!(
            changes,
            vec![
                (AssetStatus::InStock, AssetStatus::Issued),
                (AssetStatus::Issued, AssetStatus::UnderRepair),
                (AssetStatus::UnderRepair, AssetStatus::BeyondRepair),
            ]
        );
    }

    #[test]
    fn test_unauthorized_mutations() {
        let table = RoleTable::new(&[AccessGrant {
            role: "clerk".to_string(),
            resources: vec![Resource::Asset],
            actions: vec![Action::Create],
        }]);
        let f = fixture_with_access(Arc::new(table));
        let clerk = Actor::new("u-1", "clerk");

        let asset = f.registry.register(&clerk, laptop("LT-0001")).unwrap();

        let err = f
            .registry
            .set_status(&clerk, &asset.id, AssetStatus::UnderRepair, "x")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = f.registry.dispose(&clerk, &asset.id, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let stranger = Actor::new("u-2", "visitor");
        let err = f.registry.register(&stranger, laptop("LT-0002")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_find_missing() {
        let f = fixture();
        assert_eq!(f.registry.find("nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            f.registry.find_by_barcode("NOPE-1").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
