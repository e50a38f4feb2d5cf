//! Seam to the external identity client.
//!
//! The provider's protocol (authorization code with PKCE, token issuance,
//! silent SSO refresh) lives behind this trait. Everything in this crate only
//! reads through it.

use std::time::Duration;

use async_trait::async_trait;

use keygate_core::IdentityClientError;

use crate::Role;
use crate::claims::RawClaims;
use crate::config::InitOptions;

#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Start the client. Resolves to whether a session already exists.
    async fn init(&self, options: &InitOptions) -> Result<bool, IdentityClientError>;

    /// Whether the client currently holds an active session.
    fn is_logged_in(&self) -> Result<bool, IdentityClientError>;

    /// Realm and client-scoped roles visible to this client.
    fn user_roles(&self) -> Result<Vec<Role>, IdentityClientError>;

    /// Send the user to the provider's login page.
    ///
    /// In a browser this navigates away and never resolves; other clients may
    /// resolve once the redirect has been issued.
    async fn login(&self, redirect_uri: &str) -> Result<(), IdentityClientError>;

    async fn logout(&self, redirect_uri: &str) -> Result<(), IdentityClientError>;

    /// Fetch the user's profile from the provider's account endpoint.
    async fn load_user_profile(&self) -> Result<RawClaims, IdentityClientError>;

    /// Refresh the access token if it expires within `min_validity`.
    /// Resolves to `true` when a refresh happened.
    async fn update_token(&self, min_validity: Duration) -> Result<bool, IdentityClientError>;

    /// Current access token, if any.
    async fn token(&self) -> Result<Option<String>, IdentityClientError>;
}
