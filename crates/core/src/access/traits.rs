use thiserror::Error;

use super::types::{Action, Resource};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Answers whether a role may perform an action on a kind of record.
pub trait AccessControl: Send + Sync {
    fn allows(&self, role: &str, resource: Resource, action: Action) -> bool;

    /// Name of this access control policy
    fn method_name(&self) -> &'static str;
}
