use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered account as stored in the database. The credential columns
/// (`hashed_password`, `two_factor_secret`) never leave the server; use
/// [`UserResponse`] for anything that goes over the wire.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    /// Base32 TOTP secret issued at registration.
    pub two_factor_secret: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to persist a new account. Credential material arrives
/// already hashed/generated; the store layer never sees a plaintext password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub two_factor_secret: String,
}

/// Public projection of a user, safe to serialize into responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}
