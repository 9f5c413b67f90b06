//! Per-asset mutual exclusion for read-resolve-write sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Map of asset id to a mutex serializing every workflow step on that asset.
/// Ticket workflows keep a second instance keyed by ticket id.
///
/// Entries are created on demand and dropped once no caller holds or waits
/// for them, so the map only grows with concurrent activity.
#[derive(Default)]
pub struct AssetLocks {
    entries: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AssetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `asset_id`.
    ///
    /// Not re-entrant: `f` must not lock the same asset again.
    pub fn with<T>(&self, asset_id: &str, f: impl FnOnce() -> T) -> T {
        let entry = {
            let mut entries = self.entries();
            Arc::clone(entries.entry(asset_id.to_string()).or_default())
        };

        let result = {
            // A panic inside a previous holder leaves no partial state in `()`.
            let _guard = entry.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };

        let mut entries = self.entries();
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&entry) == 2 {
            entries.remove(asset_id);
        }

        result
    }

    /// Number of assets currently locked or contended.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
