//! Authentication endpoints: login, logout, and identity echo.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{CookieConfig, HasAuthState, RequireAuth};
use crate::jwt::JwtConfig;
use crate::login::{self, LoginError};

/// Header selecting how an issued token is returned to the client.
pub const TOKEN_DELIVERY_HEADER: &str = "X-Token-Delivery";

/// State for auth endpoints.
#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtConfig>,
    pub cookie: Option<CookieConfig>,
}

impl HasAuthState for AuthState {
    fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }
    fn cookie_config(&self) -> Option<&CookieConfig> {
        self.cookie.as_ref()
    }
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/authenticate", post(authenticate))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateRequest {
    login_id: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateResponse {
    access_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    user_id: i64,
    login_id: String,
}

/// Client-selected representation of the issued token.
enum TokenDelivery {
    Json,
    Cookie,
}

fn parse_token_delivery(headers: &HeaderMap) -> Result<TokenDelivery, ApiError> {
    let Some(value) = headers.get(TOKEN_DELIVERY_HEADER) else {
        return Ok(TokenDelivery::Json);
    };
    match value.to_str() {
        Ok("") | Ok("json") => Ok(TokenDelivery::Json),
        Ok("cookie") => Ok(TokenDelivery::Cookie),
        _ => Err(ApiError::bad_request(
            "invalid_token_delivery",
            "X-Token-Delivery must be 'json' or 'cookie'",
        )),
    }
}

// --- Handlers ---

async fn authenticate(
    State(state): State<AuthState>,
    headers: HeaderMap,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    // An unrecognized delivery mode is rejected before any credential is
    // examined.
    let delivery = parse_token_delivery(&headers)?;

    let Json(payload) = payload.map_err(|e| {
        tracing::warn!(error = %e, "Invalid authenticate request");
        ApiError::bad_request("invalid_authenticate_request", "request body is invalid")
    })?;

    if payload.login_id.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request(
            "invalid_authenticate_request",
            "request body is invalid",
        ));
    }

    let token = login::authenticate(state.jwt.as_ref(), &payload.login_id, &payload.password)
        .map_err(|e| match e {
            LoginError::Unauthenticated => {
                tracing::warn!(login_id = %payload.login_id, "Unauthenticated");
                ApiError::unauthorized("unauthenticated", "Unauthorized")
            }
            LoginError::TokenCreation(e) => {
                tracing::error!(error = %e, "Failed to create token");
                ApiError::internal("internal_server_error", "Internal Server Error")
            }
        })?;

    match delivery {
        TokenDelivery::Cookie => {
            let Some(cookie) = &state.cookie else {
                tracing::error!("Cookie delivery requested but no cookie is configured");
                return Err(ApiError::internal(
                    "cookie_not_configured",
                    "cookie delivery is not configured",
                ));
            };
            let value = cookie.set_cookie_value(&token, state.jwt.ttl_secs());
            Ok((
                [(header::SET_COOKIE, value)],
                Json(AuthenticateResponse { access_token: None }),
            )
                .into_response())
        }
        TokenDelivery::Json => Ok(Json(AuthenticateResponse {
            access_token: Some(token),
        })
        .into_response()),
    }
}

async fn logout(State(state): State<AuthState>) -> Result<Response, ApiError> {
    let Some(cookie) = &state.cookie else {
        tracing::error!("Logout requested but no cookie is configured");
        return Err(ApiError::internal(
            "cookie_not_configured",
            "cookie delivery is not configured",
        ));
    };

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cookie.clear_cookie_value())],
    )
        .into_response())
}

async fn me(RequireAuth(user): RequireAuth) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        login_id: user.login_id,
    })
}
