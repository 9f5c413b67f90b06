//! Drains the event channel into an [`EventStore`].

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{EventEnvelope, EventHandle, EventRecord, EventStore};

impl From<EventEnvelope> for EventRecord {
    /// Index columns come from the event itself; the store assigns `id`.
    fn from(envelope: EventEnvelope) -> Self {
        let event = envelope.event;
        Self {
            id: 0,
            timestamp: envelope.timestamp,
            event_type: event.event_type().to_string(),
            asset_id: event.asset_id().map(String::from),
            ticket_id: event.ticket_id().map(String::from),
            actor_id: event.actor_id().map(String::from),
            data: event,
        }
    }
}

/// Persists lifecycle events off the workflow threads.
///
/// A failed insert is logged and skipped; the workflow that raised the
/// event has already committed.
pub struct EventWriter {
    rx: mpsc::Receiver<EventEnvelope>,
    store: Arc<dyn EventStore>,
}

impl EventWriter {
    pub fn new(rx: mpsc::Receiver<EventEnvelope>, store: Arc<dyn EventStore>) -> Self {
        Self { rx, store }
    }

    /// Consume events until every [`EventHandle`] is dropped.
    pub async fn run(mut self) {
        tracing::info!("Event writer started");
        let mut written = 0u64;
        let mut failed = 0u64;

        while let Some(envelope) = self.rx.recv().await {
            let record = EventRecord::from(envelope);
            match self.store.insert(&record) {
                Ok(_) => written += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        event_type = %record.event_type,
                        asset_id = ?record.asset_id,
                        ticket_id = ?record.ticket_id,
                        error = %e,
                        "Failed to persist lifecycle event"
                    );
                }
            }
        }

        tracing::info!(written, failed, "Event writer shutting down");
    }
}

/// Build the handle/writer pair.
///
/// Spawn the writer with `tokio::spawn(writer.run())` and clone the handle
/// into every workflow. Workflows use it through
/// [`super::NotificationService`], which never blocks: when the buffer is
/// full the event is dropped and counted.
pub fn create_event_system(
    store: Arc<dyn EventStore>,
    buffer_size: usize,
) -> (EventHandle, EventWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (EventHandle::new(tx), EventWriter::new(rx, store))
}
