//! Projection of provider claims into a display model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Role;
use crate::claims::{RawClaims, RoleScope};
use crate::roles::has_role;

/// Role flag keys computed for every profile.
pub const ADMIN_FLAG: &str = "admin";
pub const USER_FLAG: &str = "user";

/// Shown when no name or username is available.
pub const FALLBACK_INITIAL: &str = "U";

/// View-friendly user model. Recomputed on every access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<Role>,
    pub email_verified: Option<bool>,
    pub full_name: String,
    pub initials: String,
    pub role_flags: BTreeMap<String, bool>,
}

impl ProfileView {
    pub fn has_admin_role(&self) -> bool {
        self.flag(ADMIN_FLAG)
    }

    pub fn has_user_role(&self) -> bool {
        self.flag(USER_FLAG)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.role_flags.get(name).copied().unwrap_or(false)
    }
}

/// Project raw claims, taking roles from the claims themselves.
pub fn project(claims: &RawClaims) -> ProfileView {
    project_with_roles(claims, &claims.roles(&RoleScope::AllClients))
}

/// Project raw claims with roles supplied by the identity client.
///
/// The account endpoint answers without role claims, so the session's roles
/// are passed in separately.
pub fn project_with_roles(claims: &RawClaims, roles: &[Role]) -> ProfileView {
    let given = claims.given_name();
    let family = claims.family_name();
    let username = claims.username();

    let role_flags = [ADMIN_FLAG, USER_FLAG]
        .into_iter()
        .map(|flag| (flag.to_string(), has_role(roles, flag)))
        .collect();

    ProfileView {
        id: claims.subject().unwrap_or_default().to_string(),
        username: username.unwrap_or_default().to_string(),
        email: claims.email().unwrap_or_default().to_string(),
        first_name: given.map(str::to_string),
        last_name: family.map(str::to_string),
        roles: roles.to_vec(),
        email_verified: claims.email_verified,
        full_name: full_name(given, family, username),
        initials: initials(given, family, username),
        role_flags,
    }
}

fn full_name(given: Option<&str>, family: Option<&str>, username: Option<&str>) -> String {
    match (given, family) {
        (Some(given), Some(family)) => format!("{given} {family}"),
        (Some(name), None) | (None, Some(name)) => name.to_string(),
        (None, None) => username.unwrap_or_default().to_string(),
    }
}

fn initials(given: Option<&str>, family: Option<&str>, username: Option<&str>) -> String {
    match (given, family, username) {
        (Some(given), Some(family), _) => format!("{}{}", first_upper(given), first_upper(family)),
        (Some(given), None, _) => first_upper(given),
        (None, _, Some(username)) => first_upper(username),
        _ => FALLBACK_INITIAL.to_string(),
    }
}

fn first_upper(s: &str) -> String {
    s.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}
