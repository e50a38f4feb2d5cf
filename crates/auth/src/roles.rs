use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier as asserted by the identity provider.
///
/// Roles are opaque, case-sensitive strings. There is no hierarchy at this
/// layer: `"ADMIN"` does not imply `"MANAGER"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.0.into_owned()
    }
}

/// Build an owned role list from string literals.
pub fn role_list<I, S>(names: I) -> Vec<Role>
where
    I: IntoIterator<Item = S>,
    S: Into<Role>,
{
    names.into_iter().map(Into::into).collect()
}

/// Remove duplicates while keeping the first occurrence of each role.
pub fn dedup_roles(roles: impl IntoIterator<Item = Role>) -> Vec<Role> {
    let mut out: Vec<Role> = Vec::new();
    for role in roles {
        if !out.contains(&role) {
            out.push(role);
        }
    }
    out
}

/// Exact-match membership test.
pub fn has_role(current: &[Role], role: &str) -> bool {
    current.iter().any(|r| r.as_str() == role)
}

/// True when at least one required role is held. An empty requirement never
/// matches; callers that treat "no roles" as public must check that first.
pub fn has_any_role(current: &[Role], required: &[Role]) -> bool {
    required.iter().any(|r| current.contains(r))
}

/// True when every required role is held (vacuously true for no roles).
pub fn has_all_roles(current: &[Role], required: &[Role]) -> bool {
    required.iter().all(|r| current.contains(r))
}

/// Role names configured in the provider for the demo realm.
pub mod well_known {
    use super::Role;

    /// Full access to the application.
    pub const ADMIN: &str = "ADMIN";
    /// Team management and reporting.
    pub const MANAGER: &str = "MANAGER";
    /// Standard user.
    pub const USER: &str = "USER";

    pub const CLIENT_DEMO_APP_USER: &str = "CLIENT_DEMO_APP_USER";
    pub const CLIENT_DEMO_APP_MANAGER: &str = "CLIENT_DEMO_APP_MANAGER";
    pub const CLIENT_DEMO_APP_ADMIN: &str = "CLIENT_DEMO_APP_ADMIN";

    /// Every administrative role, realm or client scoped.
    pub const ADMINS: &[&str] = &[ADMIN, MANAGER, CLIENT_DEMO_APP_ADMIN, CLIENT_DEMO_APP_MANAGER];

    pub const ALL_USERS: &[&str] = &[USER, MANAGER, ADMIN];

    pub const DEMO_CLIENT: &[&str] = &[
        CLIENT_DEMO_APP_USER,
        CLIENT_DEMO_APP_MANAGER,
        CLIENT_DEMO_APP_ADMIN,
    ];

    /// Materialize a role group for use as a guard requirement.
    pub fn group(names: &[&'static str]) -> Vec<Role> {
        names.iter().copied().map(Role::new).collect()
    }

    /// True when the user holds at least one administrative role.
    pub fn has_admin_role(current: &[Role]) -> bool {
        ADMINS.iter().any(|admin| super::has_role(current, admin))
    }
}
