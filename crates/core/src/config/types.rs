use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::access::{Action, Resource};
use crate::directory::DirectoryEntry;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub access: AccessConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub directory: Option<DirectoryConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Access control configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessConfig {
    pub method: AccessMethod,
    /// Role grants (required when method = "role_table")
    #[serde(default)]
    pub grants: Vec<AccessGrant>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessMethod {
    AllowAll,
    RoleTable,
}

/// Permission for one role over a set of resources and actions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessGrant {
    pub role: String,
    pub resources: Vec<Resource>,
    pub actions: Vec<Action>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("custodian.db")
}

/// Lifecycle event delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Capacity of the event channel; events are dropped (and logged) when full
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_buffer_size() -> usize {
    1000
}

/// Workflow behaviour switches
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// File a ticket when an issuance comes back damaged or needing repair
    #[serde(default = "default_true")]
    pub open_ticket_on_damaged_return: bool,
    /// Run the reconciliation pass when the server starts
    #[serde(default = "default_true")]
    pub reconcile_on_startup: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            open_ticket_on_damaged_return: true,
            reconcile_on_startup: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Static directory entries (categories, departments, employees, users)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub categories: Vec<DirectoryEntry>,
    #[serde(default)]
    pub departments: Vec<DirectoryEntry>,
    #[serde(default)]
    pub employees: Vec<DirectoryEntry>,
    #[serde(default)]
    pub users: Vec<DirectoryEntry>,
}

/// Sanitized config for API responses (directory contents summarized)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub access: SanitizedAccessConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub notifications: NotificationConfig,
    pub workflow: WorkflowConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<SanitizedDirectoryConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAccessConfig {
    pub method: String,
    pub roles: Vec<String>,
}

/// Entry counts only
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDirectoryConfig {
    pub categories: usize,
    pub departments: usize,
    pub employees: usize,
    pub users: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let mut roles: Vec<String> = config
            .access
            .grants
            .iter()
            .map(|g| g.role.clone())
            .collect();
        roles.sort();
        roles.dedup();

        Self {
            access: SanitizedAccessConfig {
                method: match config.access.method {
                    AccessMethod::AllowAll => "allow_all".to_string(),
                    AccessMethod::RoleTable => "role_table".to_string(),
                },
                roles,
            },
            server: config.server.clone(),
            database: config.database.clone(),
            notifications: config.notifications.clone(),
            workflow: config.workflow.clone(),
            directory: config.directory.as_ref().map(|d| SanitizedDirectoryConfig {
                categories: d.categories.len(),
                departments: d.departments.len(),
                employees: d.employees.len(),
                users: d.users.len(),
            }),
        }
    }
}
