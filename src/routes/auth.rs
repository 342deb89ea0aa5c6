use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

use crate::auth::{
    build_session_cookie, expired_session_cookie, totp, CurrentIdentity, LoginCheck, LoginRequest,
    RegisterRequest, SESSION_COOKIE_NAME,
};
use crate::error::AppError;
use crate::models::{NewUser, Session, UserResponse};
use crate::state::AppState;

/// Register a new user
///
/// Creates the account and returns the generated two-factor secret exactly
/// once; the caller provisions their authenticator app from it. Logins are
/// impossible without it.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    body.validate()?;

    if !state.authenticator.password_is_acceptable(&body.password) {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            state.auth_config.minimum_password_length
        )));
    }

    let hashed_password = state.authenticator.hash_password(&body.password)?;
    let two_factor_secret = totp::generate_secret();

    let user = state
        .users
        .create_user(NewUser {
            username: body.username.clone(),
            email: body.email.clone(),
            hashed_password,
            two_factor_secret: two_factor_secret.clone(),
        })
        .await?;

    log::info!("registered user {}", user.username);
    Ok(HttpResponse::Created().json(json!({
        "user": UserResponse::from(&user),
        "two_factor_secret": two_factor_secret,
    })))
}

/// Log in with username, password, and a fresh one-time code.
///
/// The attempt monitor is consulted before anything else so an exhausted
/// caller never makes the server hash. A stored hash at an outdated cost is
/// upgraded in place on the way through, invisibly to the user; a failed
/// upgrade *write* is a 500, because at that point the credentials were
/// already verified.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    body.validate()?;

    if state.login_monitor.attempts_exhausted(&body.username) {
        log::warn!("login attempts exhausted for {}", body.username);
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let user = match state.users.get_user_by_username(&body.username).await {
        Ok(user) => user,
        // An unknown username answers the same 401 as a bad password. A
        // transient store failure must NOT: it propagates as a 500.
        Err(AppError::NotFound(_)) => {
            state.login_monitor.log_unsuccessful_attempt(&body.username);
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
        Err(err) => return Err(err),
    };

    match state.authenticator.validate_login(
        &user.hashed_password,
        &body.password,
        &user.two_factor_secret,
        &body.totp_code,
    ) {
        LoginCheck::Granted { needs_rehash } => {
            if needs_rehash {
                let upgraded = state.authenticator.hash_password(&body.password)?;
                state
                    .users
                    .update_user_password(user.id, &upgraded)
                    .await?;
                log::info!("upgraded password hash cost for {}", user.username);
            }

            state.login_monitor.log_successful_attempt(&user.username);

            let cookie =
                build_session_cookie(state.cookie_codec.as_ref(), &Session::for_user(&user))?;
            Ok(HttpResponse::Ok().cookie(cookie).json(json!({
                "authenticated": true,
                "user": UserResponse::from(&user),
            })))
        }
        LoginCheck::PasswordMismatch => {
            state.login_monitor.log_unsuccessful_attempt(&user.username);
            Err(AppError::Unauthorized("Invalid credentials".into()))
        }
        LoginCheck::SecondFactorRejected { password_matched } => {
            state.login_monitor.log_unsuccessful_attempt(&user.username);
            // The password result is logged for the audit trail but the
            // response stays as vague as every other rejection.
            log::info!(
                "rejected login for {}: invalid two-factor code (password matched: {})",
                user.username,
                password_matched
            );
            Err(AppError::InvalidSecondFactor)
        }
    }
}

/// Log out by instructing the client to discard the cookie. There is no
/// server-side session store, so there is nothing to revoke; the route is
/// idempotent and succeeds without a session.
#[post("/logout")]
pub async fn logout() -> impl Responder {
    HttpResponse::Ok()
        .cookie(expired_session_cookie())
        .json(json!({ "authenticated": false }))
}

/// Reports whether the caller holds a usable session. Never errors: an
/// absent, expired, or tampered cookie simply reads as anonymous.
#[get("/status")]
pub async fn status(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let session = req
        .cookie(SESSION_COOKIE_NAME)
        .and_then(|cookie| state.cookie_codec.decode(cookie.value()).ok());

    match session {
        Some(session) => HttpResponse::Ok().json(json!({
            "authenticated": true,
            "username": session.username,
            "is_admin": session.is_admin,
        })),
        None => HttpResponse::Ok().json(json!({ "authenticated": false })),
    }
}

/// Rotates the session-cookie key, invalidating every outstanding session —
/// the caller's included, so their cookie is expired in the same response.
/// Admin-only.
#[post("")]
pub async fn cycle_key(
    state: web::Data<AppState>,
    identity: CurrentIdentity,
) -> Result<impl Responder, AppError> {
    if !identity.0.is_admin() {
        return Err(AppError::Forbidden("Administrator access required".into()));
    }

    state.cookie_codec.cycle_key()?;
    Ok(HttpResponse::Ok()
        .cookie(expired_session_cookie())
        .json(json!({ "cycled": true })))
}
