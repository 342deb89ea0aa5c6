//!
//! # Authentication
//!
//! Everything the service knows about verifying callers lives here: password
//! hashing and the login decision (`password`), one-time codes (`totp`), the
//! sealed session cookie (`cookie`), brute-force bookkeeping (`monitor`), the
//! per-request middleware (`middleware`), and the typed extractors handlers
//! use to receive the authenticated identity (`extractors`).

pub mod cookie;
pub mod extractors;
pub mod middleware;
pub mod monitor;
pub mod password;
pub mod totp;

use lazy_static::lazy_static;
use serde::Deserialize;
use validator::Validate;

pub use cookie::{
    build_session_cookie, expired_session_cookie, CookieCodec, SealedCodec, SESSION_COOKIE_NAME,
};
pub use extractors::{AuthenticatedUserId, CurrentIdentity};
pub use middleware::AuthMiddleware;
pub use monitor::{LoginAttemptMonitor, MemoryLoginMonitor, NoopLoginMonitor};
pub use password::{Authenticator, BcryptAuthenticator, LoginCheck};

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Who a request is acting as, decided once by [`AuthMiddleware`] and carried
/// in request extensions. Handlers never re-derive this; they read it through
/// the typed extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A browser session, decoded from the cookie and re-checked against the
    /// user store.
    User {
        user_id: i32,
        username: String,
        is_admin: bool,
    },
    /// An OAuth2 client presenting a valid bearer token. The client acts on
    /// behalf of its owning user.
    Client {
        client_id: String,
        owner_user_id: i32,
    },
}

impl Identity {
    /// The user ID everything downstream is scoped to: the user themselves,
    /// or the owner of the authenticated client.
    pub fn principal_id(&self) -> i32 {
        match self {
            Identity::User { user_id, .. } => *user_id,
            Identity::Client { owner_user_id, .. } => *owner_user_id,
        }
    }

    /// Only a session-derived identity can be an administrator; clients never
    /// inherit their owner's admin bit.
    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::User { is_admin: true, .. })
    }
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username the credentials belong to.
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    /// The user's password. Length policy is enforced at registration, not
    /// here; an over-short password at login is simply a mismatch.
    pub password: String,
    /// Current 6-digit one-time code from the user's authenticator app.
    #[validate(length(min = 6, max = 8))]
    pub totp_code: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username for the new account.
    /// Must be between 3 and 32 characters, alphanumeric, and can include underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// Email address for the new account.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// Password for the new account. The minimum length is configuration
    /// (`AuthConfig::minimum_password_length`), so the handler checks it via
    /// `Authenticator::password_is_acceptable` rather than a derive attribute.
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_login_request_validation() {
        let valid_login = LoginRequest {
            username: "frieda".to_string(),
            password: "correct horse battery".to_string(),
            totp_code: "123456".to_string(),
        };
        assert!(valid_login.validate().is_ok());

        let short_username = LoginRequest {
            username: "fr".to_string(),
            password: "correct horse battery".to_string(),
            totp_code: "123456".to_string(),
        };
        assert!(short_username.validate().is_err());

        let short_code = LoginRequest {
            username: "frieda".to_string(),
            password: "correct horse battery".to_string(),
            totp_code: "123".to_string(),
        };
        assert!(short_code.validate().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let valid_register = RegisterRequest {
            username: "test_user-123".to_string(),
            email: "test@example.com".to_string(),
            password: "a perfectly long password".to_string(),
        };
        assert!(valid_register.validate().is_ok());

        let invalid_username_register = RegisterRequest {
            username: "test user!".to_string(), // Contains space and exclamation
            email: "test@example.com".to_string(),
            password: "a perfectly long password".to_string(),
        };
        assert!(invalid_username_register.validate().is_err());

        let invalid_email_register = RegisterRequest {
            username: "test_user".to_string(),
            email: "testexample.com".to_string(),
            password: "a perfectly long password".to_string(),
        };
        assert!(invalid_email_register.validate().is_err());
    }

    #[test]
    fn test_identity_principal_is_the_owner_for_clients() {
        let user = Identity::User {
            user_id: 7,
            username: "frieda".to_string(),
            is_admin: false,
        };
        let client = Identity::Client {
            client_id: "abc123".to_string(),
            owner_user_id: 7,
        };

        assert_eq!(user.principal_id(), 7);
        assert_eq!(client.principal_id(), 7);
    }

    #[test]
    fn test_clients_are_never_admins() {
        let admin = Identity::User {
            user_id: 1,
            username: "root".to_string(),
            is_admin: true,
        };
        let client = Identity::Client {
            client_id: "abc123".to_string(),
            owner_user_id: 1,
        };

        assert!(admin.is_admin());
        assert!(!client.is_admin());
    }
}
