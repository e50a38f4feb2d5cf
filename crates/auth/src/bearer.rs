use serde::{Deserialize, Serialize};

/// Decides which outgoing requests carry the access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BearerPolicy {
    pub prefix: String,
    /// A request is left untouched when its URL contains any of these
    /// (ASCII case-insensitive).
    pub excluded_urls: Vec<String>,
}

impl Default for BearerPolicy {
    fn default() -> Self {
        Self {
            prefix: "Bearer".to_string(),
            excluded_urls: vec!["/assets".to_string(), "/clients".to_string()],
        }
    }
}

impl BearerPolicy {
    /// Add an exclusion unless it is already listed.
    pub fn excluding(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() && !self.excluded_urls.contains(&url) {
            self.excluded_urls.push(url);
        }
        self
    }

    pub fn should_attach(&self, url: &str) -> bool {
        let url = url.to_ascii_lowercase();
        !self
            .excluded_urls
            .iter()
            .any(|excluded| url.contains(&excluded.to_ascii_lowercase()))
    }

    /// `Authorization` header value for a token.
    pub fn header_value(&self, token: &str) -> String {
        format!("{} {}", self.prefix, token)
    }
}
