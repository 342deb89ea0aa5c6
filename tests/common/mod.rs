//! Shared harness for the integration suites: the full app wired over
//! in-memory stores, so no external services are needed.

// Not every suite uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;

use taskvault::auth::{totp, Authenticator, BcryptAuthenticator, MemoryLoginMonitor, SealedCodec};
use taskvault::config::AuthConfig;
use taskvault::models::User;
use taskvault::oauth2::MemoryTokenStore;
use taskvault::state::AppState;
use taskvault::stores::{MemoryClientStore, MemoryTaskStore, MemoryUserStore};

/// Meets the default 16-character minimum.
pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub struct TestHarness {
    pub state: AppState,
    pub users: Arc<MemoryUserStore>,
    pub clients: Arc<MemoryClientStore>,
    pub tokens: Arc<MemoryTokenStore>,
}

/// Low bcrypt cost so the suites stay fast; the logic under test is the same
/// at any cost.
pub fn fast_auth_config() -> AuthConfig {
    AuthConfig {
        hash_cost: 4,
        minimum_hash_cost: 4,
        minimum_password_length: 16,
        max_login_attempts: 3,
    }
}

pub fn harness() -> TestHarness {
    harness_with(fast_auth_config())
}

pub fn harness_with(auth: AuthConfig) -> TestHarness {
    let users = Arc::new(MemoryUserStore::new());
    let clients = Arc::new(MemoryClientStore::new());
    let tokens = Arc::new(MemoryTokenStore::new());

    let state = AppState::new(
        users.clone(),
        clients.clone(),
        Arc::new(MemoryTaskStore::new()),
        tokens.clone(),
        Arc::new(BcryptAuthenticator::new(&auth)),
        Arc::new(SealedCodec::new(&[42u8; 64]).unwrap()),
        Arc::new(MemoryLoginMonitor::new(auth.max_login_attempts)),
        auth,
    );

    TestHarness {
        state,
        users,
        clients,
        tokens,
    }
}

/// Seeds a user directly into the store, bypassing the registration route.
/// Returns the user and their TOTP secret.
pub fn seed_user(
    harness: &TestHarness,
    id: i32,
    username: &str,
    password_hash_cost: u32,
    is_admin: bool,
) -> (User, String) {
    let secret = totp::generate_secret();
    let hasher = BcryptAuthenticator::new(&AuthConfig {
        hash_cost: password_hash_cost,
        ..fast_auth_config()
    });
    let user = User {
        id,
        username: username.to_string(),
        email: format!("{}@example.com", username),
        hashed_password: hasher.hash_password(TEST_PASSWORD).unwrap(),
        two_factor_secret: secret.clone(),
        is_admin,
        created_at: Utc::now(),
    };
    harness.users.seed_user(user.clone());
    (user, secret)
}

/// The code a user's authenticator app would show right now.
pub fn current_code(secret: &str) -> String {
    totp::current_code(secret).unwrap()
}

/// Builds the app exactly as `main` wires it, minus CORS.
#[macro_export]
macro_rules! test_app {
    ($harness:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($harness.state.clone()))
                .service(taskvault::routes::health::health)
                .service(actix_web::web::scope("/api").configure(taskvault::routes::config)),
        )
        .await
    };
}
