use actix_web::cookie::{time::Duration, Cookie, CookieJar, Key};
use std::sync::RwLock;

use crate::error::AppError;
use crate::models::Session;

/// The one cookie name this service ever sets or reads.
pub const SESSION_COOKIE_NAME: &str = "taskvault_session";

/// Turns a [`Session`] into an opaque cookie value and back. The production
/// codec both signs and encrypts; test doubles can be plainer.
pub trait CookieCodec: Send + Sync {
    fn encode(&self, session: &Session) -> Result<String, AppError>;
    fn decode(&self, value: &str) -> Result<Session, AppError>;
    /// Replaces the key with a fresh random one, invalidating every cookie
    /// issued so far.
    fn cycle_key(&self) -> Result<(), AppError>;
}

/// Production codec over the private (signed + encrypted) cookie jar, so the
/// session payload is tamper-proof and unreadable to the client.
pub struct SealedCodec {
    key: RwLock<Key>,
}

impl SealedCodec {
    /// Builds the codec from configured key material. The length check
    /// happens here, once; everything downstream can assume a usable key.
    pub fn new(key_material: &[u8]) -> Result<Self, AppError> {
        if key_material.len() < 32 {
            return Err(AppError::InternalServerError(format!(
                "cookie key must be at least 32 bytes, got {}",
                key_material.len()
            )));
        }

        Ok(Self {
            key: RwLock::new(Key::derive_from(key_material)),
        })
    }
}

impl CookieCodec for SealedCodec {
    fn encode(&self, session: &Session) -> Result<String, AppError> {
        let payload = serde_json::to_string(session).map_err(|e| {
            AppError::InternalServerError(format!("Failed to serialize session: {}", e))
        })?;

        let key = self
            .key
            .read()
            .map_err(|_| AppError::InternalServerError("cookie key lock poisoned".to_string()))?;

        let mut jar = CookieJar::new();
        jar.private_mut(&key)
            .add(Cookie::new(SESSION_COOKIE_NAME, payload));

        jar.get(SESSION_COOKIE_NAME)
            .map(|sealed| sealed.value().to_string())
            .ok_or_else(|| AppError::InternalServerError("Failed to seal session".to_string()))
    }

    fn decode(&self, value: &str) -> Result<Session, AppError> {
        let key = self
            .key
            .read()
            .map_err(|_| AppError::InternalServerError("cookie key lock poisoned".to_string()))?;

        let mut jar = CookieJar::new();
        jar.add_original(Cookie::new(SESSION_COOKIE_NAME, value.to_string()));

        // Fails for values sealed under another key and for tampered values
        // alike; the caller treats every failure as "no session".
        let opened = jar
            .private(&key)
            .get(SESSION_COOKIE_NAME)
            .ok_or_else(|| AppError::Unauthorized("Invalid session cookie".to_string()))?;

        serde_json::from_str(opened.value())
            .map_err(|_| AppError::Unauthorized("Invalid session cookie".to_string()))
    }

    fn cycle_key(&self) -> Result<(), AppError> {
        let mut key = self
            .key
            .write()
            .map_err(|_| AppError::InternalServerError("cookie key lock poisoned".to_string()))?;
        *key = Key::generate();
        log::info!("session cookie key cycled; outstanding sessions invalidated");
        Ok(())
    }
}

/// Assembles the session cookie with its fixed attribute set.
///
/// Attributes are `Path=/` and `HttpOnly` only. The missing `Secure` flag and
/// `Domain` attribute are a known gap carried over from the deployed
/// behavior; leave them as they are.
pub fn build_session_cookie(
    codec: &dyn CookieCodec,
    session: &Session,
) -> Result<Cookie<'static>, AppError> {
    let value = codec.encode(session)?;

    Ok(Cookie::build(SESSION_COOKIE_NAME, value)
        .path("/")
        .http_only(true)
        .finish())
}

/// An immediately-expiring replacement cookie, used by logout.
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME, "")
        .path("/")
        .http_only(true)
        .max_age(Duration::ZERO)
        .finish()
}
