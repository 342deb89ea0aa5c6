use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{http::header, web, HttpMessage, HttpRequest};

use crate::auth::Identity;
use crate::error::AppError;
use crate::models::OAuth2Client;
use crate::oauth2::TokenStore;
use crate::stores::ClientStore;

/// The resource-owner-credentials grant. Rejected unconditionally, before
/// any client lookup; this is service policy, not per-client configuration.
pub const GRANT_PASSWORD: &str = "password";
pub const GRANT_IMPLICIT: &str = "implicit";
pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Authorization-policy callbacks over the client registry and the token
/// store. One instance serves the whole app; cloning shares the underlying
/// stores.
#[derive(Clone)]
pub struct ClientAuthority {
    clients: Arc<dyn ClientStore>,
    tokens: Arc<dyn TokenStore>,
}

impl ClientAuthority {
    pub fn new(clients: Arc<dyn ClientStore>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { clients, tokens }
    }

    /// Validates the request's bearer token, with exactly three outcomes:
    ///
    /// - no token on the request: `Ok(None)` — not an error, the caller may
    ///   try other credentials;
    /// - a token that is unknown, expired, points at a vanished client, or
    ///   whose client does not hold the scope the route names:
    ///   `Err(Unauthorized)`;
    /// - a valid token: `Ok(Some(client))`.
    ///
    /// A transient client-store failure propagates as-is so it surfaces as a
    /// 500, never as a credential rejection.
    pub async fn request_is_authenticated(
        &self,
        req: &HttpRequest,
    ) -> Result<Option<OAuth2Client>, AppError> {
        let raw = match bearer_token(req) {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let token = self.tokens.lookup(&raw).await.ok_or_else(|| {
            log::info!("rejected unknown or expired bearer token");
            AppError::Unauthorized("Invalid bearer token".into())
        })?;

        match self.clients.get_client_by_client_id(&token.client_id).await {
            Ok(client) => {
                let scope = route_scope(req);
                if !client.has_scope(&scope) {
                    log::info!(
                        "client {} holds no scope for {}",
                        client.client_id,
                        req.path()
                    );
                    return Err(AppError::Unauthorized("Invalid bearer token".into()));
                }
                Ok(Some(client))
            }
            Err(AppError::NotFound(_)) => {
                // The client was deleted after the token was issued; the
                // token is dead weight now.
                self.tokens.revoke(&raw).await;
                Err(AppError::Unauthorized("Invalid bearer token".into()))
            }
            Err(err) => Err(err),
        }
    }

    /// The scope an authorization request is asking for: the last segment of
    /// the request path, on behalf of a client that must be resolvable —
    /// either already attached to the request by the middleware, or looked
    /// up from a `client_id` query parameter.
    pub async fn resolve_scope(&self, req: &HttpRequest) -> Result<String, AppError> {
        let client = match req.extensions().get::<OAuth2Client>().cloned() {
            Some(client) => client,
            None => {
                let client_id = query_param(req, "client_id").ok_or(AppError::NoScopeFound)?;
                match self.clients.get_client_by_client_id(&client_id).await {
                    Ok(client) => client,
                    Err(AppError::NotFound(_)) => return Err(AppError::NoScopeFound),
                    Err(err) => return Err(err),
                }
            }
        };

        let scope = route_scope(req);
        if scope.is_empty() {
            return Err(AppError::NoScopeFound);
        }

        log::debug!("resolved scope {} for client {}", scope, client.client_id);
        Ok(scope)
    }

    /// The user an authorization request acts for: an attached client yields
    /// its owner, an attached session user yields themselves.
    pub fn resolve_principal(&self, req: &HttpRequest) -> Result<String, AppError> {
        match req.extensions().get::<Identity>() {
            Some(identity) => Ok(identity.principal_id().to_string()),
            None => Err(AppError::Unauthorized(
                "No authenticated principal on request".into(),
            )),
        }
    }

    /// Grant policy: `password` is always refused, `implicit` needs the
    /// client's opt-in flag, anything else is allowed for any client that
    /// exists. An unknown client answers `false`, not an error.
    pub async fn grant_is_authorized(
        &self,
        client_id: &str,
        grant_type: &str,
    ) -> Result<bool, AppError> {
        if grant_type == GRANT_PASSWORD {
            return Ok(false);
        }

        let client = match self.clients.get_client_by_client_id(client_id).await {
            Ok(client) => client,
            Err(AppError::NotFound(_)) => return Ok(false),
            Err(err) => return Err(err),
        };

        Ok(match grant_type {
            GRANT_IMPLICIT => client.implicit_allowed,
            _ => true,
        })
    }

    /// Whether the client may exercise `scope`: literal membership in its
    /// scope list, or a wildcard `*` entry.
    pub async fn client_has_scope(&self, client_id: &str, scope: &str) -> Result<bool, AppError> {
        match self.clients.get_client_by_client_id(client_id).await {
            Ok(client) => Ok(client.has_scope(scope)),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// The scope a route demands: its last non-empty path segment.
fn route_scope(req: &HttpRequest) -> String {
    req.path()
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn query_param(req: &HttpRequest, key: &str) -> Option<String> {
    web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .and_then(|params| params.get(key).cloned())
}
