//! Wiring of the registry, workflows and synchronizer into one service.

use std::path::Path;
use std::sync::Arc;

use crate::access::{AccessControl, AllowAll};
use crate::asset::{AssetRegistry, AssetStore, SqliteAssetStore};
use crate::directory::{Directory, OpenDirectory};
use crate::error::StoreError;
use crate::events::NotificationService;
use crate::issuance::{IssuanceLedger, IssuanceStore, SqliteIssuanceStore};
use crate::repair::{RepairCoordinator, RepairStore, SqliteRepairStore};
use crate::sync::{AssetLocks, LifecycleSynchronizer, Reconciler};
use crate::ticket::{SqliteTicketStore, TicketStore, TicketWorkflow};

/// The record stores backing an [`AssetLifecycle`].
#[derive(Clone)]
pub struct LifecycleStores {
    pub assets: Arc<dyn AssetStore>,
    pub tickets: Arc<dyn TicketStore>,
    pub repairs: Arc<dyn RepairStore>,
    pub issuances: Arc<dyn IssuanceStore>,
}

impl LifecycleStores {
    /// SQLite stores sharing one database file.
    pub fn sqlite(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            assets: Arc::new(SqliteAssetStore::new(path)?),
            tickets: Arc::new(SqliteTicketStore::new(path)?),
            repairs: Arc::new(SqliteRepairStore::new(path)?),
            issuances: Arc::new(SqliteIssuanceStore::new(path)?),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            assets: Arc::new(SqliteAssetStore::in_memory()?),
            tickets: Arc::new(SqliteTicketStore::in_memory()?),
            repairs: Arc::new(SqliteRepairStore::in_memory()?),
            issuances: Arc::new(SqliteIssuanceStore::in_memory()?),
        })
    }
}

/// Notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl NotificationService for NoopNotifier {
    fn notify(&self, _event: crate::events::LifecycleEvent) {}
}

/// Builder for [`AssetLifecycle`].
pub struct AssetLifecycleBuilder {
    stores: LifecycleStores,
    access: Arc<dyn AccessControl>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn NotificationService>,
    ticket_intake: bool,
}

impl AssetLifecycleBuilder {
    pub fn access(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationService>) -> Self {
        self.notifier = notifier;
        self
    }

    /// File a ticket when an asset is returned damaged or needing repair.
    pub fn with_ticket_intake(mut self, enabled: bool) -> Self {
        self.ticket_intake = enabled;
        self
    }

    pub fn build(self) -> AssetLifecycle {
        let stores = self.stores;
        let locks = Arc::new(AssetLocks::new());

        let registry = Arc::new(AssetRegistry::new(
            Arc::clone(&stores.assets),
            Arc::clone(&self.access),
            Arc::clone(&self.directory),
            Arc::clone(&self.notifier),
            locks,
        ));
        let synchronizer = Arc::new(LifecycleSynchronizer::new(
            Arc::clone(&registry),
            Arc::clone(&stores.tickets),
            Arc::clone(&stores.repairs),
            Arc::clone(&stores.issuances),
        ));
        let tickets = Arc::new(TicketWorkflow::new(
            Arc::clone(&stores.tickets),
            Arc::clone(&synchronizer),
            Arc::clone(&self.access),
            Arc::clone(&self.directory),
            Arc::clone(&self.notifier),
        ));
        let repairs = Arc::new(RepairCoordinator::new(
            Arc::clone(&stores.repairs),
            Arc::clone(&tickets),
            Arc::clone(&synchronizer),
            Arc::clone(&self.access),
            Arc::clone(&self.directory),
            Arc::clone(&self.notifier),
        ));

        let mut ledger = IssuanceLedger::new(
            Arc::clone(&stores.issuances),
            Arc::clone(&synchronizer),
            Arc::clone(&self.access),
            Arc::clone(&self.directory),
            Arc::clone(&self.notifier),
        );
        if self.ticket_intake {
            ledger = ledger.with_ticket_intake(Arc::clone(&tickets));
        }
        let issuances = Arc::new(ledger);

        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&synchronizer),
            Arc::clone(&tickets),
            Arc::clone(&stores.tickets),
            Arc::clone(&stores.repairs),
            Arc::clone(&stores.issuances),
            Arc::clone(&self.notifier),
        ));

        AssetLifecycle {
            registry,
            synchronizer,
            tickets,
            repairs,
            issuances,
            reconciler,
        }
    }
}

/// The assembled asset lifecycle service.
///
/// Every component shares one set of per-asset locks, so operations on the
/// same asset from different workflows are serialized.
#[derive(Clone)]
pub struct AssetLifecycle {
    registry: Arc<AssetRegistry>,
    synchronizer: Arc<LifecycleSynchronizer>,
    tickets: Arc<TicketWorkflow>,
    repairs: Arc<RepairCoordinator>,
    issuances: Arc<IssuanceLedger>,
    reconciler: Arc<Reconciler>,
}

impl AssetLifecycle {
    /// Start building a service over `stores`. Defaults: allow every action,
    /// accept every directory id, drop notifications, file intake tickets.
    pub fn builder(stores: LifecycleStores) -> AssetLifecycleBuilder {
        AssetLifecycleBuilder {
            stores,
            access: Arc::new(AllowAll::new()),
            directory: Arc::new(OpenDirectory),
            notifier: Arc::new(NoopNotifier),
            ticket_intake: true,
        }
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn synchronizer(&self) -> &LifecycleSynchronizer {
        &self.synchronizer
    }

    pub fn tickets(&self) -> &TicketWorkflow {
        &self.tickets
    }

    pub fn repairs(&self) -> &RepairCoordinator {
        &self.repairs
    }

    pub fn issuances(&self) -> &IssuanceLedger {
        &self.issuances
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}
