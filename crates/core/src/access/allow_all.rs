use super::{AccessControl, Action, Resource};

/// Policy that permits every action for every role.
/// Must be explicitly configured - the system won't default to this
pub struct AllowAll;

impl AllowAll {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AllowAll {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessControl for AllowAll {
    fn allows(&self, _role: &str, _resource: Resource, _action: Action) -> bool {
        true
    }

    fn method_name(&self) -> &'static str {
        "allow_all"
    }
}
