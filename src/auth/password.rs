use bcrypt::{hash, verify};
use chrono::Utc;

use crate::auth::totp;
use crate::config::AuthConfig;
use crate::error::AppError;

/// Outcome of checking a full credential set (password + one-time code).
///
/// The password result is computed first and survives whatever happens
/// afterwards: a wrong code still reports whether the password would have
/// matched, which the login route records for its audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginCheck {
    /// Both factors verified. `needs_rehash` is an advisory, not a failure:
    /// the stored hash was produced at a lower cost than currently required
    /// and should be regenerated from the (known-correct) password.
    Granted { needs_rehash: bool },
    /// The password did not match the stored hash.
    PasswordMismatch,
    /// The one-time code failed validation; the password result is carried
    /// as computed.
    SecondFactorRejected { password_matched: bool },
}

/// The credential-checking seam. Everything the service knows about password
/// hashing lives behind this trait; no caller touches the bcrypt crate
/// directly.
pub trait Authenticator: Send + Sync {
    /// Hashes a password at the configured cost.
    fn hash_password(&self, password: &str) -> Result<String, AppError>;

    /// Constant-time comparison of a candidate password against a stored
    /// hash. A malformed stored hash reads as a mismatch, never an error.
    fn password_matches(&self, hashed_password: &str, provided_password: &str) -> bool;

    /// Whether a candidate password meets the configured minimum length.
    /// The boundary is inclusive: exactly the minimum is acceptable.
    fn password_is_acceptable(&self, password: &str) -> bool;

    /// Whether a stored hash was produced at an acceptable cost. The cost is
    /// read out of the hash string itself; a hash it cannot be parsed from
    /// is reported as insufficient.
    fn hash_cost_is_sufficient(&self, hashed_password: &str) -> bool;

    /// Full login decision over password, stored hash, and one-time code.
    /// See [`LoginCheck`] for the outcome contract.
    fn validate_login(
        &self,
        hashed_password: &str,
        provided_password: &str,
        two_factor_secret: &str,
        two_factor_code: &str,
    ) -> LoginCheck;
}

/// Production [`Authenticator`] over the bcrypt crate.
pub struct BcryptAuthenticator {
    hash_cost: u32,
    minimum_hash_cost: u32,
    minimum_password_length: usize,
}

impl BcryptAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            hash_cost: config.hash_cost,
            minimum_hash_cost: config.minimum_hash_cost,
            minimum_password_length: config.minimum_password_length,
        }
    }
}

impl Default for BcryptAuthenticator {
    fn default() -> Self {
        Self::new(&AuthConfig::default())
    }
}

impl Authenticator for BcryptAuthenticator {
    fn hash_password(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.hash_cost)
            .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
    }

    fn password_matches(&self, hashed_password: &str, provided_password: &str) -> bool {
        verify(provided_password, hashed_password).unwrap_or(false)
    }

    fn password_is_acceptable(&self, password: &str) -> bool {
        password.len() >= self.minimum_password_length
    }

    fn hash_cost_is_sufficient(&self, hashed_password: &str) -> bool {
        match parse_hash_cost(hashed_password) {
            Some(cost) => cost >= self.minimum_hash_cost,
            None => false,
        }
    }

    fn validate_login(
        &self,
        hashed_password: &str,
        provided_password: &str,
        two_factor_secret: &str,
        two_factor_code: &str,
    ) -> LoginCheck {
        // The password check runs before the code check so its result is
        // available to report either way.
        let password_matched = self.password_matches(hashed_password, provided_password);

        if !totp::verify_code(two_factor_secret, two_factor_code, Utc::now()) {
            return LoginCheck::SecondFactorRejected { password_matched };
        }

        if password_matched {
            LoginCheck::Granted {
                needs_rehash: !self.hash_cost_is_sufficient(hashed_password),
            }
        } else {
            LoginCheck::PasswordMismatch
        }
    }
}

/// Reads the cost factor out of a modular-crypt bcrypt string,
/// e.g. `$2b$12$<salt+digest>` parses to 12.
fn parse_hash_cost(hashed_password: &str) -> Option<u32> {
    let mut parts = hashed_password.split('$');
    // Leading '$' yields an empty first segment.
    if !parts.next()?.is_empty() {
        return None;
    }
    let version = parts.next()?;
    if !matches!(version, "2a" | "2b" | "2x" | "2y") {
        return None;
    }
    parts.next()?.parse().ok()
}
