use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use keygate_core::IdentityClientError;

use crate::Role;
use crate::claims::{RawClaims, RoleScope, TokenLifetime};
use crate::config::InitOptions;
use crate::identity::IdentityClient;

/// Identity client operations, used to inject failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    IsLoggedIn,
    UserRoles,
    Login,
    Logout,
    LoadProfile,
    UpdateToken,
    Token,
}

#[derive(Debug, Default)]
struct State {
    initialized: bool,
    session: Option<RawClaims>,
    token: Option<String>,
    lifetime: Option<TokenLifetime>,
    failures: HashMap<Operation, IdentityClientError>,
    login_redirects: Vec<String>,
    logout_redirects: Vec<String>,
    refreshes: u32,
}

/// Claims-backed identity client.
///
/// Intended for tests/dev. Login only records the redirect (the session does
/// not change); logout records the redirect and drops the session.
#[derive(Debug, Default)]
pub struct InMemoryIdentityClient {
    scope: RoleScope,
    state: RwLock<State>,
}

const TOKEN: &str = "in-memory-access-token";

impl InMemoryIdentityClient {
    /// Initialized client without a session.
    pub fn anonymous() -> Self {
        let client = Self::default();
        client.state_mut().initialized = true;
        client
    }

    /// Initialized client with a session described by `claims`.
    pub fn signed_in(claims: RawClaims) -> Self {
        let client = Self::anonymous();
        client.sign_in(claims);
        client
    }

    pub fn with_scope(mut self, scope: RoleScope) -> Self {
        self.scope = scope;
        self
    }

    /// Reset to a client that rejects every call until `init` succeeds.
    pub fn uninitialized(self) -> Self {
        self.state_mut().initialized = false;
        self
    }

    pub fn with_lifetime(self, lifetime: TokenLifetime) -> Self {
        self.state_mut().lifetime = Some(lifetime);
        self
    }

    pub fn failing(self, operation: Operation, error: IdentityClientError) -> Self {
        self.fail(operation, error);
        self
    }

    pub fn sign_in(&self, claims: RawClaims) {
        let mut state = self.state_mut();
        state.lifetime = claims.lifetime();
        state.token = Some(TOKEN.to_string());
        state.session = Some(claims);
    }

    pub fn sign_out(&self) {
        let mut state = self.state_mut();
        state.session = None;
        state.token = None;
        state.lifetime = None;
    }

    pub fn fail(&self, operation: Operation, error: IdentityClientError) {
        self.state_mut().failures.insert(operation, error);
    }

    pub fn clear_failures(&self) {
        self.state_mut().failures.clear();
    }

    pub fn login_redirects(&self) -> Vec<String> {
        self.state
            .read()
            .map(|s| s.login_redirects.clone())
            .unwrap_or_default()
    }

    pub fn logout_redirects(&self) -> Vec<String> {
        self.state
            .read()
            .map(|s| s.logout_redirects.clone())
            .unwrap_or_default()
    }

    pub fn refresh_count(&self) -> u32 {
        self.state.read().map(|s| s.refreshes).unwrap_or_default()
    }

    pub fn lifetime(&self) -> Option<TokenLifetime> {
        self.state.read().ok().and_then(|s| s.lifetime)
    }

    /// Setters recover a poisoned guard; client calls report it instead.
    fn state_mut(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, operation: Operation) -> Result<RwLockReadGuard<'_, State>, IdentityClientError> {
        let state = self
            .state
            .read()
            .map_err(|_| IdentityClientError::unexpected("lock poisoned"))?;
        Self::check(&state, operation)?;
        Ok(state)
    }

    fn write(&self, operation: Operation) -> Result<RwLockWriteGuard<'_, State>, IdentityClientError> {
        let state = self
            .state
            .write()
            .map_err(|_| IdentityClientError::unexpected("lock poisoned"))?;
        Self::check(&state, operation)?;
        Ok(state)
    }

    fn check(state: &State, operation: Operation) -> Result<(), IdentityClientError> {
        if let Some(error) = state.failures.get(&operation) {
            return Err(error.clone());
        }
        if !state.initialized && operation != Operation::Init {
            return Err(IdentityClientError::NotInitialized);
        }
        Ok(())
    }

    fn not_authenticated() -> IdentityClientError {
        IdentityClientError::rejected("not authenticated")
    }
}

#[async_trait]
impl IdentityClient for InMemoryIdentityClient {
    async fn init(&self, _options: &InitOptions) -> Result<bool, IdentityClientError> {
        let mut state = self.write(Operation::Init)?;
        state.initialized = true;
        Ok(state.session.is_some())
    }

    fn is_logged_in(&self) -> Result<bool, IdentityClientError> {
        Ok(self.read(Operation::IsLoggedIn)?.session.is_some())
    }

    fn user_roles(&self) -> Result<Vec<Role>, IdentityClientError> {
        let state = self.read(Operation::UserRoles)?;
        Ok(state
            .session
            .as_ref()
            .map(|claims| claims.roles(&self.scope))
            .unwrap_or_default())
    }

    async fn login(&self, redirect_uri: &str) -> Result<(), IdentityClientError> {
        let mut state = self.write(Operation::Login)?;
        state.login_redirects.push(redirect_uri.to_string());
        Ok(())
    }

    async fn logout(&self, redirect_uri: &str) -> Result<(), IdentityClientError> {
        let mut state = self.write(Operation::Logout)?;
        state.logout_redirects.push(redirect_uri.to_string());
        state.session = None;
        state.token = None;
        state.lifetime = None;
        Ok(())
    }

    async fn load_user_profile(&self) -> Result<RawClaims, IdentityClientError> {
        let state = self.read(Operation::LoadProfile)?;
        state
            .session
            .as_ref()
            .map(RawClaims::without_roles)
            .ok_or_else(Self::not_authenticated)
    }

    async fn update_token(&self, min_validity: Duration) -> Result<bool, IdentityClientError> {
        let mut state = self.write(Operation::UpdateToken)?;
        if state.session.is_none() {
            return Err(Self::not_authenticated());
        }
        let Some(lifetime) = state.lifetime else {
            return Ok(false);
        };

        let min_validity = chrono::Duration::from_std(min_validity)
            .map_err(|e| IdentityClientError::rejected(e.to_string()))?;
        let now = Utc::now();
        if !lifetime.is_expired(now, min_validity) {
            return Ok(false);
        }

        state.lifetime = Some(TokenLifetime::starting_at(now, lifetime.length()));
        state.refreshes += 1;
        Ok(true)
    }

    async fn token(&self) -> Result<Option<String>, IdentityClientError> {
        Ok(self.read(Operation::Token)?.token.clone())
    }
}
