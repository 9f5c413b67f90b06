use std::collections::HashMap;
use std::sync::RwLock;

use super::{Directory, DirectoryEntry, DirectoryKind};
use crate::config::DirectoryConfig;

/// Directory that accepts every id and echoes it back as the display name.
///
/// Used when no directory is configured; foreign references are then not
/// checked for existence.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenDirectory;

impl Directory for OpenDirectory {
    fn lookup(&self, _kind: DirectoryKind, id: &str) -> Option<DirectoryEntry> {
        Some(DirectoryEntry::new(id, id))
    }
}

/// In-memory directory seeded from configuration or by tests.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    entries: RwLock<HashMap<(DirectoryKind, String), DirectoryEntry>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        let directory = Self::new();
        let sections = [
            (DirectoryKind::Category, &config.categories),
            (DirectoryKind::Department, &config.departments),
            (DirectoryKind::Employee, &config.employees),
            (DirectoryKind::User, &config.users),
        ];
        for (kind, entries) in sections {
            for entry in entries {
                directory.insert(kind, entry.clone());
            }
        }
        directory
    }

    pub fn insert(&self, kind: DirectoryKind, entry: DirectoryEntry) {
        let mut entries = self.entries.write().unwrap();
        entries.insert((kind, entry.id.clone()), entry);
    }

    /// Builder-style insert.
    pub fn with(self, kind: DirectoryKind, id: &str, name: &str) -> Self {
        self.insert(kind, DirectoryEntry::new(id, name));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Directory for StaticDirectory {
    fn lookup(&self, kind: DirectoryKind, id: &str) -> Option<DirectoryEntry> {
        let entries = self.entries.read().unwrap();
        entries.get(&(kind, id.to_string())).cloned()
    }
}
