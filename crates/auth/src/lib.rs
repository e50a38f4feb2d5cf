//! `keygate-auth`: access-control decisions over an external OpenID-Connect
//! identity client.
//!
//! This crate never talks to the provider itself: the client is injected as an
//! [`IdentityClient`] and the session it owns is only ever read.

pub mod bearer;
pub mod claims;
pub mod config;
pub mod denied;
pub mod facade;
pub mod guard;
pub mod identity;
pub mod in_memory;
pub mod profile;
pub mod roles;
pub mod routes;
pub mod session;

pub use bearer::BearerPolicy;
pub use claims::{RawClaims, RoleAccess, RoleScope, TokenLifetime, TokenValidationError};
pub use config::{ConfigError, IdentityConfig, InitOptions};
pub use denied::DeniedQuery;
pub use facade::{InitOutcome, SessionQuery};
pub use guard::{GuardDecision, GuardEvaluator, GuardPolicy, NavigationRequest};
pub use identity::IdentityClient;
pub use in_memory::InMemoryIdentityClient;
pub use profile::{ProfileView, project, project_with_roles};
pub use roles::Role;
pub use routes::{NavigationOutcome, Navigator, RouteDef, RouteTable};
pub use session::Session;
