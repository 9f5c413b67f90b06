//! Directory lookups for categories, departments, employees and users.
//!
//! The lifecycle core treats these as opaque references. Lookups are used to
//! reject unknown ids when a record is created and to enrich display names.

mod memory;

pub use memory::{OpenDirectory, StaticDirectory};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LifecycleError;

/// Kind of directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryKind {
    Category,
    Department,
    Employee,
    User,
}

impl fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DirectoryKind::Category => "category",
            DirectoryKind::Department => "department",
            DirectoryKind::Employee => "employee",
            DirectoryKind::User => "user",
        };
        f.write_str(name)
    }
}

/// A resolved directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
}

impl DirectoryEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Trait for directory backends.
pub trait Directory: Send + Sync {
    /// Look up a record by kind and id.
    fn lookup(&self, kind: DirectoryKind, id: &str) -> Option<DirectoryEntry>;
}

/// Resolve a reference or fail with a validation error.
pub(crate) fn require(
    directory: &dyn Directory,
    kind: DirectoryKind,
    id: &str,
) -> Result<DirectoryEntry, LifecycleError> {
    if id.trim().is_empty() {
        return Err(LifecycleError::Validation(format!("{} id is required", kind)));
    }
    directory
        .lookup(kind, id)
        .ok_or_else(|| LifecycleError::Validation(format!("Unknown {}: {}", kind, id)))
}
