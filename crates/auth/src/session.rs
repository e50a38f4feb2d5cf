use serde::Serialize;

use crate::Role;
use crate::roles::{dedup_roles, has_all_roles, has_any_role, has_role};

/// Point-in-time view of the externally owned session.
///
/// This is derived data: it is read from the identity client and never
/// written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub authenticated: bool,
    pub roles: Vec<Role>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            authenticated: true,
            roles: dedup_roles(roles),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.authenticated && has_role(&self.roles, role)
    }

    pub fn has_any_role(&self, required: &[Role]) -> bool {
        self.authenticated && has_any_role(&self.roles, required)
    }

    pub fn has_all_roles(&self, required: &[Role]) -> bool {
        self.authenticated && has_all_roles(&self.roles, required)
    }
}
