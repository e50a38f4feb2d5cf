//! `keygate-core`: shared primitives for the access-control layer.
//!
//! This crate contains no identity-provider or routing concerns.

pub mod error;
pub mod id;

pub use error::{GateError, GateResult, IdentityClientError};
pub use id::NavigationId;
