//! Request-level metadata attached to a batch when its unit of work ends.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Summary of the authenticated principal, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Value,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<Value>, email: Option<String>) -> Self {
        Self { id: id.into(), email }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub url: String,
    pub method: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub authenticated_user: Option<Identity>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into(), url: url.into(), ..Self::default() }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.authenticated_user = Some(identity);
        self
    }

    /// Flatten into the `meta` keys of a batch. Absent values become `null`.
    pub fn to_meta(&self) -> Map<String, Value> {
        let user = match &self.authenticated_user {
            Some(identity) => json!({ "id": identity.id, "email": identity.email }),
            None => Value::Null,
        };

        let mut meta = Map::new();
        meta.insert("url".to_string(), Value::from(self.url.as_str()));
        meta.insert("method".to_string(), Value::from(self.method.as_str()));
        meta.insert("client_ip".to_string(), json!(self.client_ip));
        meta.insert("user_agent".to_string(), json!(self.user_agent));
        meta.insert("authenticated_user".to_string(), user);
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_keys() {
        let ctx = RequestContext::new("GET", "https://x/users/1")
            .with_client_ip("10.0.0.7")
            .with_identity(Identity::new(42, Some("ada@example.com".into())));

        let meta = ctx.to_meta();
        assert_eq!(meta["url"], "https://x/users/1");
        assert_eq!(meta["method"], "GET");
        assert_eq!(meta["client_ip"], "10.0.0.7");
        assert_eq!(meta["user_agent"], Value::Null);
        assert_eq!(meta["authenticated_user"], json!({"id": 42, "email": "ada@example.com"}));
    }

    #[test]
    fn test_anonymous_request() {
        let meta = RequestContext::new("POST", "/login").to_meta();
        assert_eq!(meta["authenticated_user"], Value::Null);
        assert_eq!(meta.len(), 5);
    }
}
