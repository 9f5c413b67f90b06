use serde::{Deserialize, Serialize};
use std::fmt;

/// The person performing an operation, as reported by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }

    /// Internal actor used by maintenance passes such as reconciliation.
    pub fn system() -> Self {
        Self::new("system", "system")
    }
}

/// Records guarded by access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Asset,
    Ticket,
    Repair,
    Issuance,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Asset => "asset",
            Resource::Ticket => "ticket",
            Resource::Repair => "repair",
            Resource::Issuance => "issuance",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_actor() {
        let actor = Actor::system();
        assert_eq!(actor.id, "system");
        assert_eq!(actor.role, "system");
    }

    #[test]
    fn test_resource_action_serialization() {
        assert_eq!(
            serde_json::to_string(&Resource::Issuance).unwrap(),
            "\"issuance\""
        );
        let action: Action = serde_json::from_str("\"delete\"").unwrap();
        assert_eq!(action, Action::Delete);
        assert_eq!(Action::Update.to_string(), "update");
    }
}
