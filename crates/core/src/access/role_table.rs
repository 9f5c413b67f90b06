use std::collections::{HashMap, HashSet};

use super::{AccessControl, Action, Resource};
use crate::config::AccessGrant;

/// Role based policy built from configured grants.
///
/// A role may perform an action on a resource when at least one grant for
/// that role lists both. Unknown roles are denied everything.
pub struct RoleTable {
    grants: HashMap<String, HashSet<(Resource, Action)>>,
}

impl RoleTable {
    pub fn new(grants: &[AccessGrant]) -> Self {
        let mut table: HashMap<String, HashSet<(Resource, Action)>> = HashMap::new();
        for grant in grants {
            let entry = table.entry(grant.role.clone()).or_default();
            for resource in &grant.resources {
                for action in &grant.actions {
                    entry.insert((*resource, *action));
                }
            }
        }
        Self { grants: table }
    }

    /// Roles known to this table.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }
}

impl AccessControl for RoleTable {
    fn allows(&self, role: &str, resource: Resource, action: Action) -> bool {
        self.grants
            .get(role)
            .is_some_and(|set| set.contains(&(resource, action)))
    }

    fn method_name(&self) -> &'static str {
        "role_table"
    }
}
