pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod login;

use api::create_api_router;
use auth::{CookieConfig, apply_refreshed_cookie};
use axum::{Router, middleware};
use db::Database;
use jwt::JwtConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime
    pub token_ttl: Duration,
    /// Remaining lifetime below which cookie-delivered tokens are reissued
    pub refresh_threshold: Duration,
    /// Cookie delivery settings; None disables the cookie channel
    pub cookie: Option<CookieConfig>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(
        &config.jwt_secret,
        config.token_ttl,
        config.refresh_threshold,
    ));

    let api_router = create_api_router(config.db.clone(), jwt, config.cookie.clone())
        .layer(middleware::from_fn(apply_refreshed_cookie));

    Router::new().nest("/api/v1", api_router)
}

/// Run the server on the given listener. This function blocks until the
/// server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}
