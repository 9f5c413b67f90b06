use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::LifecycleEvent;
use crate::metrics::NOTIFICATIONS_DROPPED;

/// Delivery of lifecycle events to interested parties.
///
/// Implementations must never block the caller for long and must never
/// propagate delivery failures; a failed delivery is logged and forgotten.
pub trait NotificationService: Send + Sync {
    fn notify(&self, event: LifecycleEvent);
}

/// Envelope wrapping a lifecycle event with metadata
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: LifecycleEvent,
}

/// Handle for emitting lifecycle events
///
/// This is cheaply cloneable and can be shared across threads.
/// Events are sent through a bounded channel to be written by the EventWriter.
#[derive(Clone)]
pub struct EventHandle {
    tx: mpsc::Sender<EventEnvelope>,
}

impl EventHandle {
    /// Create a new event handle from a channel sender
    pub fn new(tx: mpsc::Sender<EventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event, waiting for channel capacity.
    ///
    /// If the channel is closed, the error is logged but the caller is not failed.
    pub async fn emit(&self, event: LifecycleEvent) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::error!("Failed to emit lifecycle event: {}", e);
        }
    }

    /// Try to emit an event without blocking
    ///
    /// Returns true if the event was sent successfully, false otherwise.
    pub fn try_emit(&self, event: LifecycleEvent) -> bool {
        let event_type = event.event_type();
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                NOTIFICATIONS_DROPPED.with_label_values(&[event_type]).inc();
                tracing::error!("Failed to emit lifecycle event {}: {}", event_type, e);
                false
            }
        }
    }
}

impl NotificationService for EventHandle {
    fn notify(&self, event: LifecycleEvent) {
        self.try_emit(event);
    }
}
