use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{InMemoryCredentialStore, InMemorySessionStore, SessionStore, TokenService};
use crate::clock::SystemClock;
use crate::configuration::{CookieSettings, Settings};
use crate::error::{json_error_handler, AppError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{get_current_principal, health_check, login, logout, refresh};

/// Build the token service described by the settings
///
/// Uses the wall clock, the configured seed users and an in-memory session
/// store.
pub fn build_token_service(settings: &Settings) -> Result<TokenService, AppError> {
    let credentials = Arc::new(InMemoryCredentialStore::from_settings(&settings.users));
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

    TokenService::new(
        settings.jwt.clone(),
        credentials,
        Some(sessions),
        Arc::new(SystemClock),
    )
}

pub fn run(
    listener: TcpListener,
    tokens: TokenService,
    cookie_config: CookieSettings,
) -> Result<Server, std::io::Error> {
    let tokens_data = web::Data::new(tokens.clone());
    let cookie_data = web::Data::new(cookie_config);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())      // Standard logging
            .wrap(LoggerMiddleware)       // Request ids

            // Shared state
            .app_data(tokens_data.clone())
            .app_data(cookie_data.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))

            // Protected routes (require JWT authentication)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(tokens.clone()))
                    .route("/me", web::get().to(get_current_principal))
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
