//! Session Query Facade: read-only queries over the identity client.

use std::sync::Arc;

use serde::Serialize;

use keygate_core::{GateError, GateResult, IdentityClientError};

use crate::Role;
use crate::config::IdentityConfig;
use crate::identity::IdentityClient;
use crate::profile::{ProfileView, project_with_roles};
use crate::roles::{dedup_roles, has_all_roles, has_any_role, has_role};
use crate::session::Session;

/// Result of [`SessionQuery::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitOutcome {
    pub authenticated: bool,
    pub profile: Option<ProfileView>,
}

/// Read-only capability over the externally owned session.
///
/// Cheap to clone; every query goes to the identity client at call time.
#[derive(Clone)]
pub struct SessionQuery {
    client: Arc<dyn IdentityClient>,
    config: Arc<IdentityConfig>,
}

impl core::fmt::Debug for SessionQuery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionQuery")
            .field("realm", &self.config.realm)
            .field("client_id", &self.config.client_id)
            .finish_non_exhaustive()
    }
}

impl SessionQuery {
    pub fn new(client: Arc<dyn IdentityClient>, config: IdentityConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Start the identity client and, when a session exists, load the profile.
    ///
    /// A failed start is logged and reported as unauthenticated.
    pub async fn initialize(&self) -> InitOutcome {
        let authenticated = match self.client.init(&self.config.init).await {
            Ok(authenticated) => authenticated,
            Err(err) => {
                tracing::error!(error = %err, realm = %self.config.realm, "identity client initialization failed");
                false
            }
        };
        tracing::info!(authenticated, realm = %self.config.realm, "identity client initialized");

        let profile = if authenticated { self.profile().await } else { None };
        InitOutcome {
            authenticated,
            profile,
        }
    }

    pub fn try_is_authenticated(&self) -> Result<bool, IdentityClientError> {
        self.client.is_logged_in()
    }

    /// True iff the client reports an active session; failures count as no session.
    pub fn is_authenticated(&self) -> bool {
        self.try_is_authenticated().unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to read authentication state");
            false
        })
    }

    /// Realm and client-scoped roles, duplicates removed, in client order.
    pub fn try_current_roles(&self) -> Result<Vec<Role>, IdentityClientError> {
        let roles = dedup_roles(self.client.user_roles()?);
        tracing::debug!(roles = ?roles, "read current roles");
        Ok(roles)
    }

    pub fn current_roles(&self) -> Vec<Role> {
        self.try_current_roles().unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to read current roles");
            Vec::new()
        })
    }

    pub fn snapshot(&self) -> Session {
        if self.is_authenticated() {
            Session::authenticated(self.current_roles())
        } else {
            Session::anonymous()
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        has_role(&self.current_roles(), role)
    }

    pub fn has_any_role(&self, required: &[Role]) -> bool {
        has_any_role(&self.current_roles(), required)
    }

    pub fn has_all_roles(&self, required: &[Role]) -> bool {
        has_all_roles(&self.current_roles(), required)
    }

    /// Fetch and project the user's profile.
    ///
    /// Without a session the profile endpoint is not contacted. Any client
    /// failure on the way is `ProfileUnavailable`, never a partial view.
    pub async fn fetch_profile(&self) -> GateResult<ProfileView> {
        if !self.try_is_authenticated().map_err(Self::unavailable)? {
            return Err(GateError::Unauthenticated);
        }

        let claims = self
            .client
            .load_user_profile()
            .await
            .map_err(Self::unavailable)?;
        let roles = self.try_current_roles().map_err(Self::unavailable)?;

        Ok(project_with_roles(&claims, &roles))
    }

    fn unavailable(err: IdentityClientError) -> GateError {
        tracing::warn!(error = %err, "failed to load user profile");
        GateError::profile_unavailable(err.to_string())
    }

    /// Like [`fetch_profile`](Self::fetch_profile), with every failure recovered
    /// into an absent profile.
    pub async fn profile(&self) -> Option<ProfileView> {
        self.fetch_profile().await.ok()
    }

    /// Send the user to the provider; they come back to `return_path`.
    pub async fn login(&self, return_path: &str) -> Result<(), IdentityClientError> {
        let redirect_uri = self.config.redirect_uri(return_path);
        tracing::info!(redirect_uri = %redirect_uri, "redirecting to identity provider login");
        self.client.login(&redirect_uri).await
    }

    /// End the session; the provider sends the user back to the app origin.
    pub async fn logout(&self) -> Result<(), IdentityClientError> {
        self.client.logout(&self.config.app_origin).await
    }

    /// Refresh the token if it expires within the configured minimum validity.
    pub async fn refresh_token(&self) -> Result<bool, IdentityClientError> {
        let refreshed = self
            .client
            .update_token(self.config.min_token_validity())
            .await?;
        if refreshed {
            tracing::debug!("access token refreshed");
        }
        Ok(refreshed)
    }

    pub async fn token(&self) -> Result<Option<String>, IdentityClientError> {
        self.client.token().await
    }

    /// `Authorization` header value for a request to `url`, if one applies.
    pub async fn authorization_header(&self, url: &str) -> Result<Option<String>, IdentityClientError> {
        let policy = self.config.bearer_policy();
        if !policy.should_attach(url) {
            return Ok(None);
        }
        Ok(self.token().await?.map(|token| policy.header_value(&token)))
    }
}
