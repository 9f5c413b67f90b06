//! In-memory lifecycle wired to fixtures.

use std::sync::Arc;

use super::{fixtures, RecordingNotifier};
use crate::access::{AccessControl, AllowAll, RoleTable};
use crate::asset::{Asset, AssetStatus};
use crate::repair::{OpenRepair, RepairRecord};
use crate::service::{AssetLifecycle, LifecycleStores};
use crate::ticket::Ticket;

/// An [`AssetLifecycle`] over in-memory stores with a recording notifier
/// and a directory holding every fixture id.
pub struct TestLifecycle {
    pub lifecycle: AssetLifecycle,
    pub notifier: Arc<RecordingNotifier>,
    /// Direct store access for simulating interrupted workflows.
    pub stores: LifecycleStores,
}

impl TestLifecycle {
    /// Every action allowed, ticket intake on damaged return enabled.
    pub fn new() -> Self {
        Self::build(Arc::new(AllowAll::new()), true)
    }

    /// Access checked against [`fixtures::grants`].
    pub fn with_role_table() -> Self {
        Self::build(Arc::new(RoleTable::new(&fixtures::grants())), true)
    }

    pub fn without_ticket_intake() -> Self {
        Self::build(Arc::new(AllowAll::new()), false)
    }

    fn build(access: Arc<dyn AccessControl>, ticket_intake: bool) -> Self {
        let stores = LifecycleStores::in_memory().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let lifecycle = AssetLifecycle::builder(stores.clone())
            .access(access)
            .with_directory(Arc::new(fixtures::directory()))
            .with_notifier(notifier.clone())
            .with_ticket_intake(ticket_intake)
            .build();
        Self {
            lifecycle,
            notifier,
            stores,
        }
    }

    /// Register a fixture laptop as the admin.
    pub fn register_asset(&self, barcode: &str) -> Asset {
        self.lifecycle
            .registry()
            .register(&fixtures::admin(), fixtures::laptop(barcode))
            .unwrap()
    }

    /// Report a problem with the asset as the fixture reporter.
    pub fn open_ticket(&self, asset_id: &str) -> Ticket {
        self.lifecycle
            .tickets()
            .create(&fixtures::reporter(), fixtures::hinge_ticket(), Some(asset_id))
            .unwrap()
    }

    pub fn open_request(&self, ticket_id: &str, asset_id: &str) -> OpenRepair {
        OpenRepair {
            ticket_id: ticket_id.to_string(),
            asset_id: asset_id.to_string(),
            technician_id: fixtures::technician().id,
            diagnosis: None,
        }
    }

    /// Take the asset in for repair as the fixture technician.
    pub fn open_repair(&self, ticket_id: &str, asset_id: &str) -> RepairRecord {
        self.lifecycle
            .repairs()
            .open_repair(&fixtures::technician(), self.open_request(ticket_id, asset_id))
            .unwrap()
    }

    pub fn asset_status(&self, asset_id: &str) -> AssetStatus {
        self.lifecycle.registry().find(asset_id).unwrap().status
    }
}

impl Default for TestLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
