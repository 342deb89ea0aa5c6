use actix_web::{delete, get, post, web, HttpResponse, Responder};
use chrono::Duration;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthenticatedUserId, LoginCheck};
use crate::error::AppError;
use crate::models::{CreateClientRequest, NewClient};
use crate::oauth2::authority::GRANT_CLIENT_CREDENTIALS;
use crate::state::AppState;

/// Issued tokens live for an hour; clients re-run the grant when it lapses.
const TOKEN_TTL_SECONDS: i64 = 3600;

/// Standard OAuth2 token request, form-encoded per RFC 6749.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

/// Token endpoint. Only the `client_credentials` grant is served here; the
/// browser-redirect grants have no endpoint in this service, though the
/// authority's policy callbacks still govern them.
///
/// Every failure is the same vague 401: which of grant type, client, secret,
/// or scope was wrong is not information an unauthenticated caller gets.
#[post("/token")]
pub async fn issue_token(
    state: web::Data<AppState>,
    form: web::Form<TokenRequest>,
) -> Result<impl Responder, AppError> {
    if form.grant_type != GRANT_CLIENT_CREDENTIALS
        || !state
            .authority
            .grant_is_authorized(&form.client_id, &form.grant_type)
            .await?
    {
        log::info!(
            "refused token request for client {} with grant {}",
            form.client_id,
            form.grant_type
        );
        return Err(AppError::Unauthorized("Invalid token request".into()));
    }

    let client = match state.clients.get_client_by_client_id(&form.client_id).await {
        Ok(client) => client,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::Unauthorized("Invalid token request".into()))
        }
        Err(err) => return Err(err),
    };

    if client.client_secret != form.client_secret {
        state.login_monitor.log_unsuccessful_attempt(&form.client_id);
        return Err(AppError::Unauthorized("Invalid token request".into()));
    }

    if !state
        .authority
        .client_has_scope(&client.client_id, &form.scope)
        .await?
    {
        log::info!(
            "client {} requested scope {} it does not hold",
            client.client_id,
            form.scope
        );
        return Err(AppError::Unauthorized("Invalid token request".into()));
    }

    let token = state
        .tokens
        .issue(
            &client.client_id,
            client.belongs_to_user,
            &form.scope,
            Duration::seconds(TOKEN_TTL_SECONDS),
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "access_token": token.access_token,
        "token_type": "Bearer",
        "expires_in": TOKEN_TTL_SECONDS,
        "scope": token.scope,
    })))
}

/// Registers a new OAuth2 client for the verified user.
///
/// Holding a valid session is not enough: minting API credentials re-runs
/// the full login check (password and a fresh one-time code), so a hijacked
/// cookie alone cannot create a durable credential. The generated
/// `client_secret` appears in this response and nowhere else.
#[post("")]
pub async fn create_client(
    state: web::Data<AppState>,
    _auth: AuthenticatedUserId,
    body: web::Json<CreateClientRequest>,
) -> Result<impl Responder, AppError> {
    body.validate()?;

    let user = match state.users.get_user_by_username(&body.username).await {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::Unauthorized("Invalid credentials".into()))
        }
        Err(err) => return Err(err),
    };

    match state.authenticator.validate_login(
        &user.hashed_password,
        &body.password,
        &user.two_factor_secret,
        &body.totp_code,
    ) {
        LoginCheck::Granted { .. } => {}
        LoginCheck::PasswordMismatch => {
            return Err(AppError::Unauthorized("Invalid credentials".into()))
        }
        LoginCheck::SecondFactorRejected { .. } => return Err(AppError::InvalidSecondFactor),
    }

    let client = state
        .clients
        .create_client(NewClient {
            client_id: Uuid::new_v4().simple().to_string(),
            client_secret: random_secret(),
            redirect_uri: body.redirect_uri.clone(),
            scopes: body.scopes.clone(),
            implicit_allowed: body.implicit_allowed,
            belongs_to_user: user.id,
        })
        .await?;

    log::info!(
        "created OAuth2 client {} for user {}",
        client.client_id,
        user.username
    );
    Ok(HttpResponse::Created().json(client))
}

/// Lists the caller's own clients.
#[get("")]
pub async fn list_clients(
    state: web::Data<AppState>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let clients = state.clients.get_clients_for_user(auth.0).await?;
    Ok(HttpResponse::Ok().json(clients))
}

/// Fetches one of the caller's clients. Someone else's client is a 404,
/// indistinguishable from a client that never existed.
#[get("/{id}")]
pub async fn get_client(
    state: web::Data<AppState>,
    auth: AuthenticatedUserId,
    path: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let client = state.clients.get_client(path.into_inner(), auth.0).await?;
    Ok(HttpResponse::Ok().json(client))
}

/// Deletes one of the caller's clients. Tokens already issued to it die on
/// their next use, when the authority fails to resolve the client.
#[delete("/{id}")]
pub async fn delete_client(
    state: web::Data<AppState>,
    auth: AuthenticatedUserId,
    path: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    state.clients.delete_client(id, auth.0).await?;
    log::info!("deleted OAuth2 client {} for user {}", id, auth.0);
    Ok(HttpResponse::NoContent().finish())
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
