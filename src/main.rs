use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;

use taskvault::auth::{BcryptAuthenticator, MemoryLoginMonitor, SealedCodec};
use taskvault::config::Config;
use taskvault::oauth2::MemoryTokenStore;
use taskvault::routes;
use taskvault::state::AppState;
use taskvault::stores::{PgClientStore, PgTaskStore, PgUserStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // The cookie key is checked here, once; a short key never starts the
    // server.
    let codec = SealedCodec::new(config.cookie_key.as_bytes())
        .expect("COOKIE_KEY is not usable as a session cookie key");

    let state = AppState::new(
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgClientStore::new(pool.clone())),
        Arc::new(PgTaskStore::new(pool.clone())),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(BcryptAuthenticator::new(&config.auth)),
        Arc::new(codec),
        Arc::new(MemoryLoginMonitor::new(config.auth.max_login_attempts)),
        config.auth.clone(),
    );

    log::info!("starting taskvault on {}", config.server_url());

    let bind_addr = (config.server_host.clone(), config.server_port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(web::scope("/api").configure(routes::config))
    })
    .bind(bind_addr)?
    .run()
    .await
}
