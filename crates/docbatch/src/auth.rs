//! API-key authentication.

use std::collections::HashMap;

use crate::config::AuthConfig;

/// Authenticated identity making a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caller {
    pub user_id: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Maps bearer API keys to callers.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyAuthenticator {
    keys: HashMap<String, String>,
}

impl ApiKeyAuthenticator {
    pub fn from_config(config: &AuthConfig) -> Self {
        let keys = config
            .api_keys
            .iter()
            .map(|entry| (entry.key.clone(), entry.user_id.clone()))
            .collect();
        Self { keys }
    }

    /// Resolves the value of an `Authorization` header.
    ///
    /// Accepts `Bearer <key>` only. Unknown keys resolve to `None`.
    pub fn authenticate(&self, authorization: Option<&str>) -> Option<Caller> {
        let key = authorization?.trim().strip_prefix("Bearer ")?.trim();
        if key.is_empty() {
            return None;
        }
        self.keys.get(key).map(Caller::new)
    }
}
