//! Identity provider configuration.
//!
//! Values come from JSON (`from_json_str`) or from `KEYGATE_*` environment
//! variables (`from_env`), falling back to a local development realm.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bearer::BearerPolicy;

pub const DEFAULT_IDENTITY_URL: &str = "http://localhost:8080";
pub const DEFAULT_REALM: &str = "demo";
pub const DEFAULT_CLIENT_ID: &str = "angular-app";
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:4200";
pub const DEFAULT_MIN_TOKEN_VALIDITY_SECS: u64 = 30;
pub const DEFAULT_SILENT_CHECK_SSO_PATH: &str = "/assets/silent-check-sso.html";

pub const ENV_IDENTITY_URL: &str = "KEYGATE_IDENTITY_URL";
pub const ENV_REALM: &str = "KEYGATE_REALM";
pub const ENV_CLIENT_ID: &str = "KEYGATE_CLIENT_ID";
pub const ENV_APP_ORIGIN: &str = "KEYGATE_APP_ORIGIN";
pub const ENV_MIN_TOKEN_VALIDITY_SECS: &str = "KEYGATE_MIN_TOKEN_VALIDITY_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {key}: expected a number of seconds")]
    InvalidNumber { key: &'static str, value: String },

    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the client does on startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnLoad {
    /// Silently probe for an existing session; public pages stay reachable.
    #[default]
    CheckSso,
    /// Force a login before the application starts.
    LoginRequired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    /// Authorization code flow.
    #[default]
    Standard,
    Implicit,
    Hybrid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceMethod {
    #[default]
    S256,
}

/// Options handed to the identity client's `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitOptions {
    pub on_load: OnLoad,
    /// Path (relative to the app origin) of the silent SSO probe page.
    pub silent_check_sso_path: String,
    /// Periodically poll the provider's login-status iframe.
    pub check_login_iframe: bool,
    pub flow: Flow,
    pub pkce_method: PkceMethod,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            on_load: OnLoad::CheckSso,
            silent_check_sso_path: DEFAULT_SILENT_CHECK_SSO_PATH.to_string(),
            check_login_iframe: true,
            flow: Flow::Standard,
            pkce_method: PkceMethod::S256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityConfig {
    /// Base URL of the identity provider.
    pub url: String,
    pub realm: String,
    pub client_id: String,
    /// Origin of the application; login and logout redirects come back here.
    pub app_origin: String,
    pub init: InitOptions,
    pub bearer: BearerPolicy,
    pub min_token_validity_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_IDENTITY_URL.to_string(),
            realm: DEFAULT_REALM.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            app_origin: DEFAULT_APP_ORIGIN.to_string(),
            init: InitOptions::default(),
            bearer: BearerPolicy::default(),
            min_token_validity_secs: DEFAULT_MIN_TOKEN_VALIDITY_SECS,
        }
    }
}

impl IdentityConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `KEYGATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, test fixtures, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |key: &'static str, default: &str| {
            lookup(key).unwrap_or_else(|| {
                tracing::warn!(key, default, "setting not provided; using development default");
                default.to_string()
            })
        };

        let min_token_validity_secs = match lookup(ENV_MIN_TOKEN_VALIDITY_SECS) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: ENV_MIN_TOKEN_VALIDITY_SECS,
                    value,
                })?,
            None => DEFAULT_MIN_TOKEN_VALIDITY_SECS,
        };

        let config = Self {
            url: setting(ENV_IDENTITY_URL, DEFAULT_IDENTITY_URL),
            realm: setting(ENV_REALM, DEFAULT_REALM),
            client_id: setting(ENV_CLIENT_ID, DEFAULT_CLIENT_ID),
            app_origin: setting(ENV_APP_ORIGIN, DEFAULT_APP_ORIGIN),
            min_token_validity_secs,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Missing("url"));
        }
        if self.realm.trim().is_empty() {
            return Err(ConfigError::Missing("realm"));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("clientId"));
        }
        Ok(())
    }

    /// Absolute URL the provider sends the browser back to after login.
    pub fn redirect_uri(&self, path: &str) -> String {
        let origin = self.app_origin.trim_end_matches('/');
        if path.is_empty() || path.starts_with('/') {
            format!("{origin}{path}")
        } else {
            format!("{origin}/{path}")
        }
    }

    pub fn silent_check_sso_redirect_uri(&self) -> String {
        self.redirect_uri(&self.init.silent_check_sso_path)
    }

    pub fn min_token_validity(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.min_token_validity_secs)
    }

    /// Bearer policy with the provider's own URL always excluded.
    pub fn bearer_policy(&self) -> BearerPolicy {
        self.bearer.clone().excluding(self.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_target_local_development_realm() {
        let config = IdentityConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.url, "http://localhost:8080");
        assert_eq!(config.realm, "demo");
        assert_eq!(config.client_id, "angular-app");
        assert_eq!(config.min_token_validity().as_secs(), 30);
        assert_eq!(config.init.on_load, OnLoad::CheckSso);
        assert!(config.init.check_login_iframe);
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = IdentityConfig::from_lookup(lookup_from(&[
            (ENV_IDENTITY_URL, "https://sso.example.com"),
            (ENV_REALM, "corp"),
            (ENV_CLIENT_ID, "portal"),
            (ENV_MIN_TOKEN_VALIDITY_SECS, " 45 "),
        ]))
        .unwrap();
        assert_eq!(config.url, "https://sso.example.com");
        assert_eq!(config.realm, "corp");
        assert_eq!(config.client_id, "portal");
        assert_eq!(config.min_token_validity_secs, 45);
    }

    #[test]
    fn rejects_non_numeric_validity() {
        let err = IdentityConfig::from_lookup(lookup_from(&[(ENV_MIN_TOKEN_VALIDITY_SECS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }

    #[test]
    fn rejects_empty_realm() {
        let err = IdentityConfig::from_lookup(lookup_from(&[(ENV_REALM, " ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("realm")));
    }

    #[test]
    fn json_document_uses_camel_case_and_defaults() {
        let config = IdentityConfig::from_json_str(
            r#"{ "url": "https://sso.example.com", "clientId": "portal",
                 "init": { "onLoad": "login-required" } }"#,
        )
        .unwrap();
        assert_eq!(config.client_id, "portal");
        assert_eq!(config.realm, "demo");
        assert_eq!(config.init.on_load, OnLoad::LoginRequired);
        assert_eq!(config.init.flow, Flow::Standard);
    }

    #[test]
    fn redirect_uris_are_built_from_the_origin() {
        let config = IdentityConfig {
            app_origin: "https://app.example.com/".to_string(),
            ..IdentityConfig::default()
        };
        assert_eq!(config.redirect_uri("/admin?tab=2"), "https://app.example.com/admin?tab=2");
        assert_eq!(config.redirect_uri("admin"), "https://app.example.com/admin");
        assert_eq!(
            config.silent_check_sso_redirect_uri(),
            "https://app.example.com/assets/silent-check-sso.html"
        );
    }

    #[test]
    fn bearer_policy_excludes_the_provider() {
        let config = IdentityConfig::default();
        let policy = config.bearer_policy();
        assert!(!policy.should_attach("http://localhost:8080/realms/demo/protocol/openid-connect/token"));
        assert!(policy.should_attach("http://localhost:8081/api/users"));
    }
}
