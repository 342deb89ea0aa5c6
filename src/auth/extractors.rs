use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::Identity;
use crate::error::AppError;

/// Extracts the effective user ID from the identity the middleware attached:
/// the session user's own ID, or the owning user's ID for an OAuth2 client.
///
/// Only meaningful on routes wrapped in `AuthMiddleware`; elsewhere it
/// answers `AppError::Unauthorized`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUserId(pub i32);

impl FromRequest for AuthenticatedUserId {
    type Error = ActixError; // AppError will be converted into ActixError via ResponseError
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Identity>() {
            Some(identity) => ready(Ok(AuthenticatedUserId(identity.principal_id()))),
            None => {
                log::error!(
                    "no identity in extensions for {}; is the route wrapped in AuthMiddleware?",
                    req.path()
                );
                ready(Err(
                    AppError::Unauthorized("Authentication required".into()).into()
                ))
            }
        }
    }
}

/// Extracts the full [`Identity`] for handlers that need to distinguish a
/// session user from an acting client (admin checks, OAuth2 callbacks).
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl FromRequest for CurrentIdentity {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Identity>().cloned() {
            Some(identity) => ready(Ok(CurrentIdentity(identity))),
            None => ready(Err(
                AppError::Unauthorized("Authentication required".into()).into()
            )),
        }
    }
}
