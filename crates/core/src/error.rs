//! Access-control error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the access-control layer.
pub type GateResult<T> = Result<T, GateError>;

/// Failure reported by the external identity client.
///
/// The provider library is a black box; these variants only classify what the
/// caller can observe at the seam.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum IdentityClientError {
    /// The client has not been initialized (or initialization failed).
    #[error("identity client is not initialized")]
    NotInitialized,

    /// The provider (or its account endpoint) could not be reached.
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),

    /// The provider answered with something the client could not use.
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),

    /// Any other unexpected failure thrown by the client library.
    #[error("identity client failure: {0}")]
    Unexpected(String),
}

impl IdentityClientError {
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }
}

/// Access-control error taxonomy.
///
/// None of these are fatal: callers recover `Unauthenticated` and
/// `InsufficientRole` into redirects, `ProfileUnavailable` into an absent
/// profile, and `IdentityClient` into a redirect to the application root.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// No active session.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Authenticated, but the role test failed.
    #[error("insufficient role: required {required:?}, current {current:?}")]
    InsufficientRole {
        required: Vec<String>,
        current: Vec<String>,
    },

    /// The profile endpoint failed (transient).
    #[error("profile unavailable: {0}")]
    ProfileUnavailable(String),

    /// Unexpected failure from the identity client.
    #[error(transparent)]
    IdentityClient(#[from] IdentityClientError),
}

impl GateError {
    pub fn profile_unavailable(msg: impl Into<String>) -> Self {
        Self::ProfileUnavailable(msg.into())
    }

    pub fn insufficient_role<R, C>(required: R, current: C) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self::InsufficientRole {
            required: required.into_iter().map(Into::into).collect(),
            current: current.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the error is recovered by sending the user somewhere else
    /// (login, denial page or application root).
    pub fn is_redirect(&self) -> bool {
        !matches!(self, Self::ProfileUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_client_error_converts_transparently() {
        let err: GateError = IdentityClientError::unreachable("timeout").into();
        assert_eq!(err.to_string(), "identity provider unreachable: timeout");
        assert!(err.is_redirect());
    }

    #[test]
    fn insufficient_role_keeps_both_role_lists_in_order() {
        let err = GateError::insufficient_role(["ADMIN", "MANAGER"], ["USER"]);
        let GateError::InsufficientRole { required, current } = &err else {
            panic!("expected InsufficientRole");
        };
        assert_eq!(required, &vec!["ADMIN".to_string(), "MANAGER".to_string()]);
        assert_eq!(current, &vec!["USER".to_string()]);
        assert!(err.to_string().contains("ADMIN"));
    }

    #[test]
    fn profile_unavailable_is_not_a_redirect() {
        assert!(!GateError::profile_unavailable("503").is_redirect());
        assert!(GateError::Unauthenticated.is_redirect());
    }
}
