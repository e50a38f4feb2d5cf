//! Query parameters of the access-denied page.
//!
//! `requiredRoles` carries the roles comma-joined, `url` the attempted path.
//! Values are percent-encoded individually so a comma inside a role name
//! survives the round trip.

use serde::Serialize;

use crate::Role;
use crate::guard::GuardDecision;

pub const ACCESS_DENIED_PATH: &str = "/access-denied";

const REQUIRED_ROLES_PARAM: &str = "requiredRoles";
const URL_PARAM: &str = "url";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeniedQuery {
    pub required_roles: Vec<Role>,
    pub url: Option<String>,
}

impl DeniedQuery {
    pub fn from_decision(decision: &GuardDecision) -> Option<Self> {
        match decision {
            GuardDecision::RedirectToDenied {
                required_roles,
                return_path,
                ..
            } => Some(Self {
                required_roles: required_roles.clone(),
                url: Some(return_path.clone()),
            }),
            _ => None,
        }
    }

    pub fn to_query_string(&self) -> String {
        let mut params: Vec<String> = Vec::new();
        if !self.required_roles.is_empty() {
            let joined = self
                .required_roles
                .iter()
                .map(|role| urlencoding::encode(role.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            params.push(format!("{REQUIRED_ROLES_PARAM}={joined}"));
        }
        if let Some(url) = &self.url {
            params.push(format!("{URL_PARAM}={}", urlencoding::encode(url)));
        }
        params.join("&")
    }

    /// Full router target, e.g. `/access-denied?requiredRoles=ADMIN&url=%2Fadmin`.
    pub fn target(&self) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            ACCESS_DENIED_PATH.to_string()
        } else {
            format!("{ACCESS_DENIED_PATH}?{query}")
        }
    }

    /// Parse a query string (with or without the leading `?`).
    ///
    /// Unknown parameters and undecodable values are ignored; the page renders
    /// whatever it can.
    pub fn parse(query: &str) -> Self {
        let mut out = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                REQUIRED_ROLES_PARAM => {
                    out.required_roles = value
                        .split(',')
                        .filter(|raw| !raw.is_empty())
                        .filter_map(decode)
                        .map(Role::new)
                        .collect();
                }
                URL_PARAM => out.url = decode(value),
                _ => {}
            }
        }
        out
    }
}

fn decode(raw: &str) -> Option<String> {
    let plus_as_space = raw.replace('+', " ");
    urlencoding::decode(&plus_as_space)
        .ok()
        .map(|decoded| decoded.into_owned())
}
