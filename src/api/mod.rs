mod auth;
mod error;
mod todos;

use axum::Router;
use std::sync::Arc;

use crate::auth::CookieConfig;
use crate::db::Database;
use crate::jwt::JwtConfig;

pub use auth::TOKEN_DELIVERY_HEADER;

/// Create the API router mounted under `/api/v1`.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    cookie: Option<CookieConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        jwt: jwt.clone(),
        cookie: cookie.clone(),
    };

    let todos_state = todos::TodosState {
        db,
        jwt,
        cookie,
    };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/todo", todos::router(todos_state))
}
