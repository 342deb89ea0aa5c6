use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::{Identity, SESSION_COOKIE_NAME};
use crate::error::AppError;
use crate::state::AppState;

/// What an unauthenticated caller gets back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnauthorizedMode {
    /// Bare 401 with the standard JSON error body. For API routes.
    Status,
    /// `303 See Other` to the login page. For browser-facing routes.
    RedirectToLogin,
}

/// Per-request authentication with strict credential precedence.
///
/// A bearer token is always tried first; a valid one wins outright. The
/// session cookie is only consulted on routes that opted in via
/// [`with_cookie_fallback`] — both when no token was presented and when the
/// presented token was rejected — and a decoded session is re-checked
/// against the user store so a deleted account cannot keep riding an old
/// cookie.
///
/// The middleware decides *whether* the request proceeds; the constructor
/// chooses the failure shape (401 vs redirect), not the handler.
///
/// [`with_cookie_fallback`]: AuthMiddleware::with_cookie_fallback
pub struct AuthMiddleware {
    cookie_fallback: bool,
    mode: UnauthorizedMode,
}

impl AuthMiddleware {
    /// Bearer-token-only authentication answering 401 on failure.
    pub fn api() -> Self {
        Self {
            cookie_fallback: false,
            mode: UnauthorizedMode::Status,
        }
    }

    /// Cookie-fallback authentication that redirects browsers to `/login`
    /// instead of answering 401.
    pub fn browser() -> Self {
        Self {
            cookie_fallback: true,
            mode: UnauthorizedMode::RedirectToLogin,
        }
    }

    /// Opts the wrapped routes into session-cookie fallback.
    pub fn with_cookie_fallback(mut self) -> Self {
        self.cookie_fallback = true;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            cookie_fallback: self.cookie_fallback,
            mode: self.mode,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    cookie_fallback: bool,
    mode: UnauthorizedMode,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let cookie_fallback = self.cookie_fallback;
        let mode = self.mode;

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| {
                    Error::from(AppError::InternalServerError(
                        "application state missing".into(),
                    ))
                })?;

            match authenticate(&req, &state, cookie_fallback).await {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                }
                // A transient store failure stays a 500; only genuine
                // credential failures take the unauthorized path.
                Err(err @ (AppError::DatabaseError(_) | AppError::InternalServerError(_))) => {
                    Err(err.into())
                }
                Err(err) => match mode {
                    UnauthorizedMode::Status => Err(err.into()),
                    UnauthorizedMode::RedirectToLogin => {
                        let response = HttpResponse::SeeOther()
                            .insert_header((header::LOCATION, "/login"))
                            .finish()
                            .map_into_right_body();
                        Ok(req.into_response(response))
                    }
                },
            }
        })
    }
}

/// The ordered credential check. The granular reason for a failure is logged
/// here and never reaches the response body.
async fn authenticate(
    req: &ServiceRequest,
    state: &AppState,
    cookie_fallback: bool,
) -> Result<Identity, AppError> {
    // Bearer token first. A rejected token ends the request only on routes
    // without cookie fallback; with fallback the cookie below still gets its
    // turn. Transient store failures stay fatal either way.
    match state.authority.request_is_authenticated(req.request()).await {
        Ok(Some(client)) => {
            let identity = Identity::Client {
                client_id: client.client_id.clone(),
                owner_user_id: client.belongs_to_user,
            };
            // The full client record rides along for the OAuth2 authorization
            // callbacks, which prefer an already-resolved client.
            req.extensions_mut().insert(client);
            return Ok(identity);
        }
        Ok(None) => {}
        Err(err @ (AppError::DatabaseError(_) | AppError::InternalServerError(_))) => {
            return Err(err)
        }
        Err(err) => {
            if !cookie_fallback {
                return Err(err);
            }
            log::info!("bearer token rejected, trying the session cookie");
        }
    }

    if cookie_fallback {
        if let Some(cookie) = req.cookie(SESSION_COOKIE_NAME) {
            match state.cookie_codec.decode(cookie.value()) {
                Ok(session) => match state.users.get_user(session.user_id).await {
                    Ok(user) => {
                        return Ok(Identity::User {
                            user_id: user.id,
                            username: user.username,
                            is_admin: user.is_admin,
                        });
                    }
                    Err(AppError::NotFound(_)) => {
                        log::info!("session cookie for vanished user {}", session.user_id);
                    }
                    Err(err) => return Err(err),
                },
                Err(_) => {
                    log::debug!("session cookie failed to decode");
                }
            }
        }
    }

    Err(AppError::Unauthorized("Authentication required".into()))
}
