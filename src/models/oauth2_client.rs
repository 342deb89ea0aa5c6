use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A registered OAuth2 API client.
///
/// `client_secret` is included when serializing because the create and read
/// routes are the only way for an owner to retrieve it; both are scoped to
/// the owning user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OAuth2Client {
    pub id: i32,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Scopes this client may request. A single `*` entry grants everything.
    pub scopes: Vec<String>,
    /// Whether the implicit grant is permitted for this client.
    pub implicit_allowed: bool,
    pub belongs_to_user: i32,
    pub created_at: DateTime<Utc>,
}

impl OAuth2Client {
    /// Literal scope membership, or a wildcard entry.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope || s == "*")
    }
}

/// A client ready to persist: route-generated credentials plus the verified
/// owner.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub implicit_allowed: bool,
    pub belongs_to_user: i32,
}

/// Input for registering a new OAuth2 client. Creating a client re-verifies
/// the full credential set even on an authenticated session.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    pub password: String,
    pub totp_code: String,
    #[validate(length(min = 1, max = 2048))]
    pub redirect_uri: String,
    #[validate(length(min = 1))]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub implicit_allowed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_scopes(scopes: &[&str]) -> OAuth2Client {
        OAuth2Client {
            id: 1,
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "https://example.com/callback".to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            implicit_allowed: false,
            belongs_to_user: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_has_scope_literal_membership() {
        let client = client_with_scopes(&["tasks", "profile"]);
        assert!(client.has_scope("tasks"));
        assert!(client.has_scope("profile"));
        assert!(!client.has_scope("admin"));
    }

    #[test]
    fn test_has_scope_wildcard_grants_everything() {
        let client = client_with_scopes(&["*"]);
        assert!(client.has_scope("tasks"));
        assert!(client.has_scope("anything-at-all"));
    }

    #[test]
    fn test_no_scopes_grants_nothing() {
        let client = client_with_scopes(&[]);
        assert!(!client.has_scope("tasks"));
    }
}
