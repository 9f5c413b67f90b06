pub mod access;
pub mod asset;
pub mod config;
mod db;
pub mod directory;
pub mod error;
pub mod events;
pub mod issuance;
pub mod metrics;
pub mod repair;
pub mod service;
pub mod sync;
pub mod testing;
pub mod ticket;

pub use access::{
    create_access_control, AccessControl, AccessError, Action, Actor, AllowAll, Resource,
    RoleTable,
};
pub use asset::{
    Asset, AssetFilter, AssetRegistry, AssetStatus, AssetStore, NewAsset, SqliteAssetStore,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AccessMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use directory::{Directory, DirectoryEntry, DirectoryKind, OpenDirectory, StaticDirectory};
pub use error::{EntityKind, ErrorKind, LifecycleError, StoreError};
pub use events::{
    create_event_system, EventFilter, EventHandle, EventRecord, EventStore, EventWriter,
    LifecycleEvent, NotificationService, SqliteEventStore,
};
pub use issuance::{
    Checkout, Issuance, IssuanceFilter, IssuanceLedger, IssuanceStatus, IssuanceStore, Recipient,
    ReturnAsset, ReturnCondition, SqliteIssuanceStore,
};
pub use repair::{
    CompleteRepair, CompletionOutcome, OpenRepair, RepairCoordinator, RepairFilter,
    RepairOutcome, RepairRecord, RepairStore, SqliteRepairStore,
};
pub use service::{AssetLifecycle, AssetLifecycleBuilder, LifecycleStores, NoopNotifier};
pub use sync::{
    AssetLocks, LifecycleSynchronizer, ReconcileReport, Reconciler, Resolution, WorkflowSnapshot,
};
pub use ticket::{
    Comment, NewTicket, SqliteTicketStore, Ticket, TicketFilter, TicketPriority, TicketStatus,
    TicketStore, TicketWorkflow,
};
