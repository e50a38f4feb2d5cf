use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;
use crate::roles::dedup_roles;

/// Role claim container (`realm_access` / `resource_access.<client>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAccess {
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Which client-scoped roles count towards the user's effective roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "client_id")]
pub enum RoleScope {
    /// Realm roles plus the roles of every client in `resource_access`.
    #[default]
    AllClients,
    /// Realm roles plus the roles of a single client.
    Client(String),
}

/// Raw claims as issued by the provider (decoded token or account endpoint).
///
/// Both the OIDC claim names and the account-endpoint field names are
/// accepted. Signature verification happens upstream; these values are taken
/// as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawClaims {
    #[serde(default, alias = "id")]
    pub sub: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, alias = "firstName")]
    pub given_name: Option<String>,

    #[serde(default, alias = "lastName")]
    pub family_name: Option<String>,

    #[serde(default, alias = "username")]
    pub preferred_username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default, alias = "emailVerified")]
    pub email_verified: Option<bool>,

    #[serde(default)]
    pub realm_access: Option<RoleAccess>,

    #[serde(default)]
    pub resource_access: BTreeMap<String, RoleAccess>,

    /// Issued-at, seconds since the epoch.
    #[serde(default)]
    pub iat: Option<i64>,

    /// Expiration, seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl RawClaims {
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn subject(&self) -> Option<&str> {
        present(&self.sub)
    }

    pub fn given_name(&self) -> Option<&str> {
        present(&self.given_name)
    }

    pub fn family_name(&self) -> Option<&str> {
        present(&self.family_name)
    }

    pub fn username(&self) -> Option<&str> {
        present(&self.preferred_username)
    }

    pub fn email(&self) -> Option<&str> {
        present(&self.email)
    }

    /// Login name with fallbacks: `preferred_username`, then `email`, then `sub`.
    pub fn resolve_username(&self) -> Option<&str> {
        self.username()
            .or_else(|| self.email())
            .or_else(|| self.subject())
    }

    pub fn realm_roles(&self) -> &[Role] {
        self.realm_access
            .as_ref()
            .map(|access| access.roles.as_slice())
            .unwrap_or(&[])
    }

    pub fn client_roles(&self, client_id: &str) -> &[Role] {
        self.resource_access
            .get(client_id)
            .map(|access| access.roles.as_slice())
            .unwrap_or(&[])
    }

    /// Effective roles: realm roles first, then client roles, duplicates removed.
    pub fn roles(&self, scope: &RoleScope) -> Vec<Role> {
        let realm = self.realm_roles().iter().cloned();
        match scope {
            RoleScope::AllClients => dedup_roles(
                realm.chain(
                    self.resource_access
                        .values()
                        .flat_map(|access| access.roles.iter().cloned()),
                ),
            ),
            RoleScope::Client(client_id) => {
                dedup_roles(realm.chain(self.client_roles(client_id).iter().cloned()))
            }
        }
    }

    /// Authority names in the `ROLE_` convention used by resource servers.
    ///
    /// Realm role `r` becomes `ROLE_R`; role `r` of client `c` becomes
    /// `ROLE_CLIENT_C_R` (upper-cased, `-` replaced by `_`).
    pub fn authorities(&self) -> Vec<String> {
        let realm = self
            .realm_roles()
            .iter()
            .map(|role| role.as_str().to_uppercase());
        let clients = self.resource_access.iter().flat_map(|(client_id, access)| {
            access
                .roles
                .iter()
                .map(move |role| qualified_client_role(client_id, role.as_str()))
        });

        let mut out: Vec<String> = Vec::new();
        for name in realm.chain(clients) {
            let authority = format!("ROLE_{name}");
            if !out.contains(&authority) {
                out.push(authority);
            }
        }
        out
    }

    /// Token lifetime, when both `iat` and `exp` are present and in range.
    pub fn lifetime(&self) -> Option<TokenLifetime> {
        let issued_at = DateTime::<Utc>::from_timestamp(self.iat?, 0)?;
        let expires_at = DateTime::<Utc>::from_timestamp(self.exp?, 0)?;
        Some(TokenLifetime {
            issued_at,
            expires_at,
        })
    }

    /// The same claims with every role claim removed.
    ///
    /// The account endpoint answers with profile fields only.
    pub fn without_roles(&self) -> Self {
        Self {
            realm_access: None,
            resource_access: BTreeMap::new(),
            ..self.clone()
        }
    }
}

/// Client role qualified with its client id, e.g. `demo-app` / `manager`
/// becomes `CLIENT_DEMO_APP_MANAGER`.
pub fn qualified_client_role(client_id: &str, role: &str) -> String {
    format!(
        "CLIENT_{}_{}",
        client_id.to_uppercase().replace('-', "_"),
        role.to_uppercase()
    )
}

/// Validity window of an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLifetime {
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

impl TokenLifetime {
    pub fn starting_at(issued_at: DateTime<Utc>, length: Duration) -> Self {
        Self {
            issued_at,
            expires_at: issued_at + length,
        }
    }

    pub fn length(&self) -> Duration {
        self.expires_at - self.issued_at
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    /// True when the token expires within `min_validity` of `now`.
    ///
    /// A zero `min_validity` only reports tokens that are already past expiry.
    pub fn is_expired(&self, now: DateTime<Utc>, min_validity: Duration) -> bool {
        self.remaining(now) < min_validity || self.remaining(now) <= Duration::zero()
    }

    /// Check the time window only; signatures are verified elsewhere.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
        if self.expires_at <= self.issued_at {
            return Err(TokenValidationError::InvalidTimeWindow);
        }
        if now < self.issued_at {
            return Err(TokenValidationError::NotYetValid);
        }
        if now >= self.expires_at {
            return Err(TokenValidationError::Expired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::role_list;
    use serde_json::json;

    fn keycloak_token() -> RawClaims {
        RawClaims::from_json(json!({
            "sub": "6f1c2a9e-0000-4000-8000-000000000001",
            "preferred_username": "jdupont",
            "email": "jean.dupont@example.com",
            "given_name": "Jean",
            "family_name": "Dupont",
            "realm_access": { "roles": ["USER", "offline_access"] },
            "resource_access": {
                "demo-app": { "roles": ["manager"] },
                "account": { "roles": ["view-profile", "USER"] }
            },
            "iat": 1_700_000_000,
            "exp": 1_700_000_300
        }))
        .unwrap()
    }

    #[test]
    fn accepts_account_endpoint_field_names() {
        let claims = RawClaims::from_json(json!({
            "id": "abc",
            "username": "jdupont",
            "firstName": "Jean",
            "lastName": "Dupont",
            "emailVerified": true
        }))
        .unwrap();

        assert_eq!(claims.subject(), Some("abc"));
        assert_eq!(claims.username(), Some("jdupont"));
        assert_eq!(claims.given_name(), Some("Jean"));
        assert_eq!(claims.family_name(), Some("Dupont"));
        assert_eq!(claims.email_verified, Some(true));
    }

    #[test]
    fn empty_strings_are_absent() {
        let claims = RawClaims {
            given_name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(claims.given_name(), None);
    }

    #[test]
    fn all_clients_scope_unions_realm_and_client_roles() {
        let claims = keycloak_token();
        assert_eq!(
            claims.roles(&RoleScope::AllClients),
            role_list(["USER", "offline_access", "view-profile", "manager"])
        );
    }

    #[test]
    fn client_scope_only_includes_that_client() {
        let claims = keycloak_token();
        assert_eq!(
            claims.roles(&RoleScope::Client("demo-app".into())),
            role_list(["USER", "offline_access", "manager"])
        );
        assert_eq!(
            claims.roles(&RoleScope::Client("unknown".into())),
            role_list(["USER", "offline_access"])
        );
    }

    #[test]
    fn authorities_follow_role_prefix_convention() {
        let claims = keycloak_token();
        assert_eq!(
            claims.authorities(),
            vec![
                "ROLE_USER",
                "ROLE_OFFLINE_ACCESS",
                "ROLE_CLIENT_ACCOUNT_VIEW-PROFILE",
                "ROLE_CLIENT_ACCOUNT_USER",
                "ROLE_CLIENT_DEMO_APP_MANAGER",
            ]
        );
    }

    #[test]
    fn qualified_client_role_normalizes_client_id() {
        assert_eq!(qualified_client_role("demo-app", "admin"), "CLIENT_DEMO_APP_ADMIN");
    }

    #[test]
    fn username_falls_back_to_email_then_subject() {
        let mut claims = keycloak_token();
        assert_eq!(claims.resolve_username(), Some("jdupont"));
        claims.preferred_username = None;
        assert_eq!(claims.resolve_username(), Some("jean.dupont@example.com"));
        claims.email = None;
        assert_eq!(
            claims.resolve_username(),
            Some("6f1c2a9e-0000-4000-8000-000000000001")
        );
    }

    #[test]
    fn without_roles_strips_role_claims_only() {
        let stripped = keycloak_token().without_roles();
        assert!(stripped.realm_roles().is_empty());
        assert!(stripped.resource_access.is_empty());
        assert_eq!(stripped.username(), Some("jdupont"));
    }

    #[test]
    fn lifetime_and_refresh_window() {
        let lifetime = keycloak_token().lifetime().unwrap();
        assert_eq!(lifetime.length(), Duration::seconds(300));

        let now = lifetime.issued_at + Duration::seconds(200);
        assert!(lifetime.validate(now).is_ok());
        assert!(!lifetime.is_expired(now, Duration::seconds(30)));

        let near_end = lifetime.issued_at + Duration::seconds(280);
        assert!(lifetime.is_expired(near_end, Duration::seconds(30)));
        assert!(!lifetime.is_expired(near_end, Duration::zero()));
    }

    #[test]
    fn validate_rejects_bad_windows() {
        let now = Utc::now();
        let expired = TokenLifetime::starting_at(now - Duration::minutes(10), Duration::minutes(5));
        assert_eq!(expired.validate(now), Err(TokenValidationError::Expired));

        let future = TokenLifetime::starting_at(now + Duration::minutes(1), Duration::minutes(5));
        assert_eq!(future.validate(now), Err(TokenValidationError::NotYetValid));

        let inverted = TokenLifetime {
            issued_at: now,
            expires_at: now,
        };
        assert_eq!(inverted.validate(now), Err(TokenValidationError::InvalidTimeWindow));
    }
}
