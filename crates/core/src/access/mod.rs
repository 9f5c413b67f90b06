mod allow_all;
mod role_table;
mod traits;
mod types;

pub use allow_all::*;
pub use role_table::*;
pub use traits::*;
pub use types::*;

use crate::config::AccessConfig;
use crate::error::LifecycleError;

/// Factory function to create the access control policy from config
pub fn create_access_control(config: &AccessConfig) -> Result<Box<dyn AccessControl>, AccessError> {
    use crate::config::AccessMethod;

    match config.method {
        AccessMethod::AllowAll => Ok(Box::new(AllowAll::new())),
        AccessMethod::RoleTable => {
            if config.grants.is_empty() {
                return Err(AccessError::ConfigurationError(
                    "at least one grant must be set when using the role_table method".to_string(),
                ));
            }
            Ok(Box::new(RoleTable::new(&config.grants)))
        }
    }
}

/// Check the actor's role before a mutation.
pub(crate) fn authorize(
    access: &dyn AccessControl,
    actor: &Actor,
    resource: Resource,
    action: Action,
) -> Result<(), LifecycleError> {
    if access.allows(&actor.role, resource, action) {
        return Ok(());
    }
    tracing::warn!(
        actor = %actor.id,
        role = %actor.role,
        %resource,
        %action,
        "Access denied"
    );
    Err(LifecycleError::Unauthorized {
        actor_id: actor.id.clone(),
        role: actor.role.clone(),
        resource,
        action,
    })
}
