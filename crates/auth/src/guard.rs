//! Navigation Guard Evaluator.
//!
//! Decides whether a navigation may proceed, given the session as reported by
//! the identity client. Decisions are plain values; performing the redirect is
//! the router's job (except the login redirect, which the identity client
//! issues itself).

use serde::Serialize;

use keygate_core::{GateError, IdentityClientError, NavigationId};

use crate::Role;
use crate::denied::DeniedQuery;
use crate::facade::SessionQuery;
use crate::roles::{has_all_roles, has_any_role};

/// Path the router falls back to when the identity client misbehaves.
pub const ROOT_PATH: &str = "/";

/// A navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationRequest {
    pub id: NavigationId,
    /// Attempted path, including any query string.
    pub target_path: String,
    /// Roles the target demands (empty = public).
    pub required_roles: Vec<Role>,
}

impl NavigationRequest {
    pub fn new(target_path: impl Into<String>) -> Self {
        Self {
            id: NavigationId::new(),
            target_path: target_path.into(),
            required_roles: Vec::new(),
        }
    }

    pub fn requiring(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.required_roles = roles.into_iter().collect();
        self
    }

    pub fn is_public(&self) -> bool {
        self.required_roles.is_empty()
    }
}

/// Outcome of a guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow,
    /// No session: the identity client has been asked to log the user in.
    RedirectToLogin { return_path: String },
    /// Session present, role test failed.
    RedirectToDenied {
        required_roles: Vec<Role>,
        current_roles: Vec<Role>,
        return_path: String,
    },
    /// The identity client failed; go back to the application root.
    RedirectToRoot { cause: IdentityClientError },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Where the router should navigate, if anywhere.
    ///
    /// `Allow` proceeds and `RedirectToLogin` is already handled by the
    /// identity client, so neither has a router target.
    pub fn router_target(&self) -> Option<String> {
        match self {
            Self::Allow | Self::RedirectToLogin { .. } => None,
            Self::RedirectToDenied { .. } => DeniedQuery::from_decision(self).map(|q| q.target()),
            Self::RedirectToRoot { .. } => Some(ROOT_PATH.to_string()),
        }
    }

    /// The error this decision recovers from, if any.
    pub fn as_error(&self) -> Option<GateError> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin { .. } => Some(GateError::Unauthenticated),
            Self::RedirectToDenied {
                required_roles,
                current_roles,
                ..
            } => Some(GateError::insufficient_role(
                required_roles.iter().map(Role::as_str),
                current_roles.iter().map(Role::as_str),
            )),
            Self::RedirectToRoot { cause } => Some(GateError::IdentityClient(cause.clone())),
        }
    }
}

/// A guard attached to a route. Several guards run in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "roles", rename_all = "snake_case")]
pub enum GuardPolicy {
    Authenticated,
    /// At least one of the roles.
    AnyRole(Vec<Role>),
    /// Every one of the roles.
    AllRoles(Vec<Role>),
}

#[derive(Debug, Clone, Copy)]
enum RoleMatch {
    Any,
    All,
}

impl RoleMatch {
    fn matches(self, current: &[Role], required: &[Role]) -> bool {
        match self {
            // No requirement means any authenticated user.
            _ if required.is_empty() => true,
            RoleMatch::Any => has_any_role(current, required),
            RoleMatch::All => has_all_roles(current, required),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardEvaluator {
    session: SessionQuery,
}

impl GuardEvaluator {
    pub fn new(session: SessionQuery) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionQuery {
        &self.session
    }

    /// Public navigations are allowed outright; otherwise the request's own
    /// roles are checked with "any of" semantics.
    pub async fn check(&self, nav: &NavigationRequest) -> GuardDecision {
        if nav.is_public() {
            return GuardDecision::Allow;
        }
        self.require_any_role(nav, &nav.required_roles).await
    }

    pub async fn require_authentication(&self, nav: &NavigationRequest) -> GuardDecision {
        self.recover(nav, self.authenticate(nav).await.map(|d| d.unwrap_or(GuardDecision::Allow)))
    }

    pub async fn require_any_role(&self, nav: &NavigationRequest, required: &[Role]) -> GuardDecision {
        let decision = self.evaluate_roles(nav, required, RoleMatch::Any).await;
        self.recover(nav, decision)
    }

    pub async fn require_all_roles(&self, nav: &NavigationRequest, required: &[Role]) -> GuardDecision {
        let decision = self.evaluate_roles(nav, required, RoleMatch::All).await;
        self.recover(nav, decision)
    }

    pub async fn evaluate(&self, nav: &NavigationRequest, policy: &GuardPolicy) -> GuardDecision {
        match policy {
            GuardPolicy::Authenticated => self.require_authentication(nav).await,
            GuardPolicy::AnyRole(roles) => self.require_any_role(nav, roles).await,
            GuardPolicy::AllRoles(roles) => self.require_all_roles(nav, roles).await,
        }
    }

    /// Run policies in order; the first decision other than `Allow` wins.
    pub async fn evaluate_all(&self, nav: &NavigationRequest, policies: &[GuardPolicy]) -> GuardDecision {
        for policy in policies {
            let decision = self.evaluate(nav, policy).await;
            if !decision.is_allowed() {
                return decision;
            }
        }
        GuardDecision::Allow
    }

    /// `Some(RedirectToLogin)` when there is no session (after asking the
    /// client to log in), `None` when the user is authenticated.
    async fn authenticate(
        &self,
        nav: &NavigationRequest,
    ) -> Result<Option<GuardDecision>, IdentityClientError> {
        if self.session.try_is_authenticated()? {
            return Ok(None);
        }

        tracing::info!(
            navigation_id = %nav.id,
            path = %nav.target_path,
            "not authenticated; redirecting to login"
        );
        self.session.login(&nav.target_path).await?;
        Ok(Some(GuardDecision::RedirectToLogin {
            return_path: nav.target_path.clone(),
        }))
    }

    async fn evaluate_roles(
        &self,
        nav: &NavigationRequest,
        required: &[Role],
        mode: RoleMatch,
    ) -> Result<GuardDecision, IdentityClientError> {
        if let Some(redirect) = self.authenticate(nav).await? {
            return Ok(redirect);
        }

        let current = self.session.try_current_roles()?;
        if mode.matches(&current, required) {
            tracing::info!(
                navigation_id = %nav.id,
                path = %nav.target_path,
                "roles satisfied; access granted"
            );
            return Ok(GuardDecision::Allow);
        }

        tracing::info!(
            navigation_id = %nav.id,
            path = %nav.target_path,
            required_roles = ?required,
            current_roles = ?current,
            mode = ?mode,
            "insufficient roles; access denied"
        );
        Ok(GuardDecision::RedirectToDenied {
            required_roles: required.to_vec(),
            current_roles: current,
            return_path: nav.target_path.clone(),
        })
    }

    fn recover(
        &self,
        nav: &NavigationRequest,
        decision: Result<GuardDecision, IdentityClientError>,
    ) -> GuardDecision {
        decision.unwrap_or_else(|err| {
            tracing::error!(
                navigation_id = %nav.id,
                path = %nav.target_path,
                error = %err,
                "guard evaluation failed; redirecting to root"
            );
            GuardDecision::RedirectToRoot { cause: err }
        })
    }
}
