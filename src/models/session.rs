use serde::{Deserialize, Serialize};

use crate::models::User;

/// Everything the session cookie carries. Kept deliberately small: the
/// user's row is re-fetched when freshness matters, so the cookie only needs
/// enough to identify the user and skip a lookup on cheap paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i32,
    pub is_admin: bool,
    pub username: String,
}

impl Session {
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            is_admin: user.is_admin,
            username: user.username.clone(),
        }
    }
}
