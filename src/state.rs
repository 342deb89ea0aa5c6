use std::sync::Arc;

use crate::auth::{Authenticator, CookieCodec, LoginAttemptMonitor};
use crate::config::AuthConfig;
use crate::oauth2::{ClientAuthority, TokenStore};
use crate::stores::{ClientStore, TaskStore, UserStore};

/// Everything the handlers and middleware share, built once in `main` and
/// cloned per worker. Each seam is a trait object so the integration suites
/// can swap in in-memory implementations without touching the routes.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub clients: Arc<dyn ClientStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub authenticator: Arc<dyn Authenticator>,
    pub cookie_codec: Arc<dyn CookieCodec>,
    pub login_monitor: Arc<dyn LoginAttemptMonitor>,
    pub authority: ClientAuthority,
    pub auth_config: AuthConfig,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserStore>,
        clients: Arc<dyn ClientStore>,
        tasks: Arc<dyn TaskStore>,
        tokens: Arc<dyn TokenStore>,
        authenticator: Arc<dyn Authenticator>,
        cookie_codec: Arc<dyn CookieCodec>,
        login_monitor: Arc<dyn LoginAttemptMonitor>,
        auth_config: AuthConfig,
    ) -> Self {
        let authority = ClientAuthority::new(clients.clone(), tokens.clone());
        Self {
            users,
            clients,
            tasks,
            tokens,
            authenticator,
            cookie_codec,
            login_monitor,
            authority,
            auth_config,
        }
    }
}
