//! Notifier that keeps every event for assertions.

use std::sync::Mutex;

use crate::events::{LifecycleEvent, NotificationService};

/// Records notified events in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(LifecycleEvent::event_type)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl NotificationService for RecordingNotifier {
    fn notify(&self, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}
