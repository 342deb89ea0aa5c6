pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::web;

use crate::auth::AuthMiddleware;
use crate::oauth2::routes as oauth2_routes;

/// Mounts the API surface. The caller wraps this in its outer scope
/// (`/api` in `main`); authentication is applied per inner scope so each
/// surface states its own credential policy.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::register)
            .service(auth::login)
            .service(auth::logout)
            .service(auth::status)
            .service(
                // Key rotation needs an authenticated admin session.
                web::scope("/cycle-key")
                    .wrap(AuthMiddleware::api().with_cookie_fallback())
                    .service(auth::cycle_key),
            ),
    )
    .service(
        web::scope("/oauth2")
            .service(oauth2_routes::issue_token)
            .service(
                web::scope("/clients")
                    .wrap(AuthMiddleware::api().with_cookie_fallback())
                    .service(oauth2_routes::create_client)
                    .service(oauth2_routes::list_clients)
                    .service(oauth2_routes::get_client)
                    .service(oauth2_routes::delete_client),
            ),
    )
    .service(
        web::scope("/tasks")
            // Bearer tokens take precedence; browsers with a session cookie
            // are accepted too.
            .wrap(AuthMiddleware::api().with_cookie_fallback())
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    );
}
