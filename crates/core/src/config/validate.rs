use std::collections::HashSet;

use super::{types::Config, AccessMethod, ConfigError};
use crate::directory::DirectoryEntry;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Event buffer is not empty
/// - Role table grants are present and complete
/// - Directory ids are unique per kind
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.notifications.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "notifications.buffer_size cannot be 0".to_string(),
        ));
    }

    if config.access.method == AccessMethod::RoleTable && config.access.grants.is_empty() {
        return Err(ConfigError::ValidationError(
            "access.grants must not be empty when method = \"role_table\"".to_string(),
        ));
    }

    for (i, grant) in config.access.grants.iter().enumerate() {
        if grant.role.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "access.grants[{}].role cannot be empty",
                i
            )));
        }
        if grant.resources.is_empty() || grant.actions.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "access.grants[{}] must list at least one resource and one action",
                i
            )));
        }
    }

    if let Some(directory) = &config.directory {
        check_unique("directory.categories", &directory.categories)?;
        check_unique("directory.departments", &directory.departments)?;
        check_unique("directory.employees", &directory.employees)?;
        check_unique("directory.users", &directory.users)?;
    }

    Ok(())
}

fn check_unique(section: &str, entries: &[DirectoryEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "{} contains duplicate id {}",
                section, entry.id
            )));
        }
    }
    Ok(())
}
