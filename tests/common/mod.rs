#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use todolite::{
    ServerConfig,
    auth::{CookieConfig, SameSite},
    create_app,
    db::Database,
};
use tower::ServiceExt;

/// Signing secret shared by all test apps (32 bytes minimum in production).
pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret-0123456789abcdef";

/// Create a test app with an in-memory database, a 60 minute TTL, a 30
/// minute refresh threshold, and a Lax cookie channel.
pub async fn create_test_app() -> axum::Router {
    create_test_app_with(60, 30, true).await
}

/// Create a test app without a cookie channel configured.
pub async fn create_test_app_no_cookie() -> axum::Router {
    create_test_app_with(60, 30, false).await
}

/// Create a test app with the given TTL and refresh threshold in minutes.
pub async fn create_test_app_with(ttl_min: u64, threshold_min: u64, cookie: bool) -> axum::Router {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    let config = ServerConfig {
        db,
        jwt_secret: TEST_JWT_SECRET.to_vec(),
        token_ttl: Duration::from_secs(ttl_min * 60),
        refresh_threshold: Duration::from_secs(threshold_min * 60),
        cookie: cookie.then(|| CookieConfig {
            name: "access_token".to_string(),
            path: "/".to_string(),
            secure: false,
            same_site: SameSite::Lax,
        }),
    };

    create_app(&config)
}

/// Read a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Authenticate and return the issued token from the JSON response.
pub async fn login(app: &axum::Router, login_id: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/authenticate")
                .header("content-type", "application/json")
                .body(Body::from(format!(
                    r#"{{"loginId":"{}","password":"{}"}}"#,
                    login_id, password
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["accessToken"]
        .as_str()
        .expect("accessToken in login response")
        .to_string()
}

/// Authenticate with cookie delivery and return the raw token value from
/// the Set-Cookie header.
pub async fn login_with_cookie(app: &axum::Router, login_id: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/authenticate")
                .header("content-type", "application/json")
                .header(todolite::api::TOKEN_DELIVERY_HEADER, "cookie")
                .body(Body::from(format!(
                    r#"{{"loginId":"{}","password":"{}"}}"#,
                    login_id, password
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("Set-Cookie in login response")
        .to_str()
        .unwrap();

    cookie_token(set_cookie).to_string()
}

/// Extract the token value from a Set-Cookie header value.
pub fn cookie_token(set_cookie: &str) -> &str {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("access_token="))
        .expect("access_token cookie pair")
}
