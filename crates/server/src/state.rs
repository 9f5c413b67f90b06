use std::sync::Arc;

use custodian_core::{
    create_access_control, AccessControl, AccessError, AssetLifecycle, Config, Directory,
    EventHandle, EventStore, LifecycleStores, OpenDirectory, SanitizedConfig, StaticDirectory,
};

/// Shared application state
pub struct AppState {
    config: Config,
    lifecycle: AssetLifecycle,
    event_store: Arc<dyn EventStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        lifecycle: AssetLifecycle,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            config,
            lifecycle,
            event_store,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn lifecycle(&self) -> &AssetLifecycle {
        &self.lifecycle
    }

    pub fn event_store(&self) -> &dyn EventStore {
        self.event_store.as_ref()
    }
}

/// Assemble the lifecycle service described by `config`.
///
/// Lifecycle events are delivered through `events`; the directory is seeded
/// from `[directory]` when present and accepts any id otherwise.
pub fn build_lifecycle(
    config: &Config,
    stores: LifecycleStores,
    events: EventHandle,
) -> Result<AssetLifecycle, AccessError> {
    let access: Arc<dyn AccessControl> = Arc::from(create_access_control(&config.access)?);
    let directory: Arc<dyn Directory> = match &config.directory {
        Some(seed) => Arc::new(StaticDirectory::from_config(seed)),
        None => Arc::new(OpenDirectory),
    };

    Ok(AssetLifecycle::builder(stores)
        .access(access)
        .with_directory(directory)
        .with_notifier(Arc::new(events))
        .with_ticket_intake(config.workflow.open_ticket_on_damaged_return)
        .build())
}
