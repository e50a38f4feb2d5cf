//! Route table and navigation.
//!
//! Paths are matched whole (no prefix matching), first match wins. `""`
//! matches only the empty path and `"**"` matches anything.

use serde::Serialize;

use crate::denied::ACCESS_DENIED_PATH;
use crate::guard::{GuardDecision, GuardEvaluator, GuardPolicy, NavigationRequest};

pub const HOME_PATH: &str = "/home";
pub const WILDCARD: &str = "**";

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDef {
    /// Path without leading slash, e.g. `admin/users`.
    pub path: String,
    pub title: Option<String>,
    pub policies: Vec<GuardPolicy>,
}

impl RouteDef {
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: normalize(&path.into()).to_string(),
            title: None,
            policies: Vec::new(),
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn guarded_by(mut self, policy: GuardPolicy) -> Self {
        self.policies.push(policy);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
enum Entry {
    Route(RouteDef),
    Redirect { path: String, to: String },
}

impl Entry {
    fn path(&self) -> &str {
        match self {
            Entry::Route(def) => &def.path,
            Entry::Redirect { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteTable {
    entries: Vec<Entry>,
}

/// What a path resolves to in the table (before guards run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    Route(&'a RouteDef),
    Redirect(&'a str),
    Unmatched,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The application's routes: home and the denial page are public, the
    /// empty path and anything unknown go home.
    pub fn application() -> Self {
        Self::new()
            .redirect("", HOME_PATH)
            .route(RouteDef::public(HOME_PATH).titled("Home"))
            .route(RouteDef::public(ACCESS_DENIED_PATH).titled("Access denied"))
            .redirect(WILDCARD, HOME_PATH)
    }

    pub fn route(mut self, def: RouteDef) -> Self {
        self.entries.push(Entry::Route(def));
        self
    }

    pub fn redirect(mut self, path: impl Into<String>, to: impl Into<String>) -> Self {
        self.entries.push(Entry::Redirect {
            path: normalize(&path.into()).to_string(),
            to: to.into(),
        });
        self
    }

    /// Insert a route ahead of the entries already present, so it wins over a
    /// trailing wildcard.
    pub fn with_route_first(mut self, def: RouteDef) -> Self {
        self.entries.insert(0, Entry::Route(def));
        self
    }

    pub fn resolve(&self, url: &str) -> Resolved<'_> {
        let path = normalize(strip_query(url));
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.path() == WILDCARD || entry.path() == path);

        match entry {
            Some(Entry::Route(def)) => Resolved::Route(def),
            Some(Entry::Redirect { to, .. }) => Resolved::Redirect(to),
            None => Resolved::Unmatched,
        }
    }
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Result of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// The route's guards allowed it; render it.
    Activated {
        url: String,
        route: String,
        title: Option<String>,
    },
    /// A guard redirected.
    Blocked { url: String, decision: GuardDecision },
    /// No route matched and there is no wildcard.
    NotFound { url: String },
    /// Redirects did not settle within [`MAX_REDIRECTS`] hops.
    RedirectLoop { url: String },
}

impl NavigationOutcome {
    /// Where the router should go next, if anywhere.
    pub fn router_target(&self) -> Option<String> {
        match self {
            Self::Blocked { decision, .. } => decision.router_target(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Navigator {
    table: RouteTable,
    guards: GuardEvaluator,
}

impl Navigator {
    pub fn new(table: RouteTable, guards: GuardEvaluator) -> Self {
        Self { table, guards }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Resolve `url` through the table's redirects, then run the route's guards.
    pub async fn navigate(&self, url: &str) -> NavigationOutcome {
        let mut current = url.to_string();

        for _ in 0..=MAX_REDIRECTS {
            match self.table.resolve(&current) {
                Resolved::Redirect(to) => {
                    tracing::debug!(from = %current, to, "route redirect");
                    current = to.to_string();
                }
                Resolved::Unmatched => {
                    tracing::debug!(url = %current, "no route matched");
                    return NavigationOutcome::NotFound { url: current };
                }
                Resolved::Route(def) => {
                    let nav = NavigationRequest::new(current.clone());
                    let decision = self.guards.evaluate_all(&nav, &def.policies).await;
                    return if decision.is_allowed() {
                        NavigationOutcome::Activated {
                            url: current,
                            route: def.path.clone(),
                            title: def.title.clone(),
                        }
                    } else {
                        NavigationOutcome::Blocked {
                            url: current,
                            decision,
                        }
                    };
                }
            }
        }

        tracing::warn!(url, "route redirects did not settle");
        NavigationOutcome::RedirectLoop {
            url: url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::claims::{RawClaims, RoleAccess};
    use crate::config::IdentityConfig;
    use crate::facade::SessionQuery;
    use crate::in_memory::InMemoryIdentityClient;
    use crate::roles::{role_list, well_known};

    fn table() -> RouteTable {
        RouteTable::application()
            .with_route_first(
                RouteDef::public("dashboard")
                    .titled("Dashboard")
                    .guarded_by(GuardPolicy::Authenticated),
            )
            .with_route_first(
                RouteDef::public("reports")
                    .titled("Reports")
                    .guarded_by(GuardPolicy::Authenticated)
                    .guarded_by(GuardPolicy::AnyRole(role_list([
                        well_known::MANAGER,
                        well_known::ADMIN,
                    ]))),
            )
            .with_route_first(
                RouteDef::public("admin")
                    .titled("Administration")
                    .guarded_by(GuardPolicy::AnyRole(well_known::group(&[
                        well_known::ADMIN,
                        well_known::MANAGER,
                    ]))),
            )
    }

    fn navigator(client: Arc<InMemoryIdentityClient>) -> Navigator {
        let session = SessionQuery::new(client, IdentityConfig::default());
        Navigator::new(table(), GuardEvaluator::new(session))
    }

    fn user_with(roles: &[&'static str]) -> Arc<InMemoryIdentityClient> {
        Arc::new(InMemoryIdentityClient::signed_in(RawClaims {
            realm_access: Some(RoleAccess {
                roles: role_list(roles.iter().copied()),
            }),
            ..Default::default()
        }))
    }

    #[test]
    fn resolve_matches_whole_paths_only() {
        let table = table();
        assert!(matches!(table.resolve("/admin"), Resolved::Route(def) if def.path == "admin"));
        assert!(matches!(table.resolve("/admin/"), Resolved::Route(_)));
        assert_eq!(table.resolve("/admin/users"), Resolved::Redirect(HOME_PATH));
        assert_eq!(table.resolve(""), Resolved::Redirect(HOME_PATH));
        assert_eq!(table.resolve("/"), Resolved::Redirect(HOME_PATH));
    }

    #[test]
    fn table_without_wildcard_leaves_unknown_paths_unmatched() {
        let table = RouteTable::new().route(RouteDef::public("home"));
        assert_eq!(table.resolve("/elsewhere"), Resolved::Unmatched);
    }

    #[tokio::test]
    async fn empty_path_lands_on_home() {
        let outcome = navigator(Arc::new(InMemoryIdentityClient::anonymous()))
            .navigate("/")
            .await;
        assert_eq!(
            outcome,
            NavigationOutcome::Activated {
                url: HOME_PATH.to_string(),
                route: "home".to_string(),
                title: Some("Home".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn unknown_path_lands_on_home() {
        let outcome = navigator(Arc::new(InMemoryIdentityClient::anonymous()))
            .navigate("/nope?x=1")
            .await;
        assert!(matches!(outcome, NavigationOutcome::Activated { ref route, .. } if route == "home"));
    }

    #[tokio::test]
    async fn guarded_route_redirects_anonymous_user_to_login() {
        let client = Arc::new(InMemoryIdentityClient::anonymous());
        let outcome = navigator(client.clone()).navigate("/dashboard?tab=2").await;
        assert!(matches!(
            outcome,
            NavigationOutcome::Blocked {
                decision: GuardDecision::RedirectToLogin { .. },
                ..
            }
        ));
        assert_eq!(
            client.login_redirects(),
            vec!["http://localhost:4200/dashboard?tab=2".to_string()]
        );
        assert_eq!(outcome.router_target(), None);
    }

    #[tokio::test]
    async fn role_guarded_route_sends_plain_user_to_denial_page() {
        let outcome = navigator(user_with(&["USER"])).navigate("/admin").await;
        assert_eq!(
            outcome.router_target().as_deref(),
            Some("/access-denied?requiredRoles=ADMIN,MANAGER&url=%2Fadmin")
        );
    }

    #[tokio::test]
    async fn stacked_guards_allow_manager_into_reports() {
        let outcome = navigator(user_with(&["MANAGER"])).navigate("/reports").await;
        assert!(matches!(outcome, NavigationOutcome::Activated { ref title, .. } if title.as_deref() == Some("Reports")));
    }

    #[tokio::test]
    async fn redirect_cycles_are_reported() {
        let table = RouteTable::new().redirect("a", "/b").redirect("b", "/a");
        let session = SessionQuery::new(
            Arc::new(InMemoryIdentityClient::anonymous()),
            IdentityConfig::default(),
        );
        let outcome = Navigator::new(table, GuardEvaluator::new(session))
            .navigate("/a")
            .await;
        assert_eq!(
            outcome,
            NavigationOutcome::RedirectLoop {
                url: "/a".to_string()
            }
        );
    }
}
