use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::AppError;

/// An issued bearer token. The token string itself is opaque: random bytes
/// with no embedded structure, dereferenced only through the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    pub access_token: String,
    pub client_id: String,
    /// The owning user the client acts on behalf of.
    pub user_id: i32,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

impl BearerToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Storage seam for issued tokens. The production implementation is
/// in-memory; a restart revokes everything outstanding, which is the
/// accepted behavior for this service's API clients.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn issue(
        &self,
        client_id: &str,
        user_id: i32,
        scope: &str,
        ttl: Duration,
    ) -> Result<BearerToken, AppError>;

    /// `None` covers both "never issued" and "expired"; expired entries are
    /// dropped on the way out.
    async fn lookup(&self, access_token: &str) -> Option<BearerToken>;

    async fn revoke(&self, access_token: &str);
}

/// 32 alphanumeric characters of randomness; matches the shape of the
/// client secrets the management routes generate.
fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, BearerToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn issue(
        &self,
        client_id: &str,
        user_id: i32,
        scope: &str,
        ttl: Duration,
    ) -> Result<BearerToken, AppError> {
        let token = BearerToken {
            access_token: random_token(),
            client_id: client_id.to_string(),
            user_id,
            scope: scope.to_string(),
            expires_at: Utc::now() + ttl,
        };

        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| AppError::InternalServerError("token store lock poisoned".into()))?;
        tokens.insert(token.access_token.clone(), token.clone());

        Ok(token)
    }

    async fn lookup(&self, access_token: &str) -> Option<BearerToken> {
        let expired = {
            let tokens = self.tokens.read().ok()?;
            match tokens.get(access_token) {
                Some(token) if !token.is_expired() => return Some(token.clone()),
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            if let Ok(mut tokens) = self.tokens.write() {
                tokens.remove(access_token);
            }
        }
        None
    }

    async fn revoke(&self, access_token: &str) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.remove(access_token);
        }
    }
}
