//! Error types shared by the lifecycle workflows.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::access::{Action, Resource};
use crate::asset::AssetStatus;

/// Failure reported by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Entity kinds referenced in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Asset,
    Ticket,
    Repair,
    Issuance,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Asset => "Asset",
            EntityKind::Ticket => "Ticket",
            EntityKind::Repair => "Repair",
            EntityKind::Issuance => "Issuance",
        };
        f.write_str(name)
    }
}

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidTransition,
    AssetUnavailable,
    Unauthorized,
    Validation,
    Store,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::AssetUnavailable => "asset_unavailable",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Validation => "validation",
            ErrorKind::Store => "store",
        }
    }
}

/// Error returned by every lifecycle operation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// The record's current status forbids the operation.
    #[error("Cannot {operation} {entity} {id}: current state is {current}")]
    InvalidState {
        entity: EntityKind,
        id: String,
        current: String,
        operation: String,
    },

    /// The asset transition table does not allow the move.
    #[error("Asset {asset_id} cannot move from {from} to {to}")]
    InvalidTransition {
        asset_id: String,
        from: AssetStatus,
        to: AssetStatus,
    },

    /// Checkout attempted on an asset that is not in stock.
    #[error("Asset {asset_id} is not available for checkout (status: {status})")]
    AssetUnavailable {
        asset_id: String,
        status: AssetStatus,
    },

    /// Access control denied the action.
    #[error("Actor {actor_id} ({role}) may not {action} {resource}")]
    Unauthorized {
        actor_id: String,
        role: String,
        resource: Resource,
        action: Action,
    },

    /// Missing or malformed input, or an unknown foreign reference.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::NotFound { .. } => ErrorKind::NotFound,
            LifecycleError::InvalidState { .. } => ErrorKind::InvalidState,
            LifecycleError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            LifecycleError::AssetUnavailable { .. } => ErrorKind::AssetUnavailable,
            LifecycleError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LifecycleError::Validation(_) => ErrorKind::Validation,
            LifecycleError::Store(_) => ErrorKind::Store,
        }
    }

    pub(crate) fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        LifecycleError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn invalid_state(
        entity: EntityKind,
        id: impl Into<String>,
        current: impl fmt::Display,
        operation: impl Into<String>,
    ) -> Self {
        LifecycleError::InvalidState {
            entity,
            id: id.into(),
            current: current.to_string(),
            operation: operation.into(),
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        LifecycleError::Validation(msg.into())
    }
}

pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;
