//! Request authentication for API routes.
//!
//! A bearer token in the Authorization header always wins over the cookie;
//! the cookie channel exists for browser sessions and is the only source
//! that participates in sliding refresh. The refreshed cookie travels from
//! the extractor to the response through a task-local, drained by the
//! [`apply_refreshed_cookie`] middleware layer.

use std::cell::RefCell;

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::jwt::{JwtConfig, TokenParser, TokenRefresher, UserInfo};

/// Required prefix of the Authorization header, exact and case-sensitive.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Cookie SameSite attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
}

impl SameSite {
    fn attribute(self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
        }
    }
}

/// Settings for cookie-based token delivery.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieConfig {
    /// Render a Set-Cookie value carrying the token.
    pub fn set_cookie_value(&self, token: &str, max_age_secs: u64) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!(
            "{}={}; HttpOnly; SameSite={}; Path={}; Max-Age={}{}",
            self.name,
            token,
            self.same_site.attribute(),
            self.path,
            max_age_secs,
            secure
        )
    }

    /// Render a Set-Cookie value that removes the token cookie.
    pub fn clear_cookie_value(&self) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!(
            "{}=; HttpOnly; SameSite={}; Path={}; Max-Age=-1{}",
            self.name,
            self.same_site.attribute(),
            self.path,
            secure
        )
    }
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Which channel a token was presented on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Header,
    Cookie,
}

/// Locate a candidate token in the request headers.
///
/// A `Bearer `-prefixed Authorization header always takes precedence, even
/// when a cookie is also present; the cookie is consulted only when no
/// Bearer header exists. Returns None when neither source yields a
/// non-empty token.
pub fn extract_token<'a>(
    headers: &'a HeaderMap,
    cookie: Option<&CookieConfig>,
) -> Option<(&'a str, TokenSource)> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix(BEARER_PREFIX) {
            if token.is_empty() {
                return None;
            }
            return Some((token, TokenSource::Header));
        }
    }

    let config = cookie?;
    let token = get_cookie(headers, &config.name)?;
    if token.is_empty() {
        return None;
    }
    Some((token, TokenSource::Cookie))
}

/// Trait for state types that support request authentication.
pub trait HasAuthState {
    fn jwt(&self) -> &JwtConfig;
    fn cookie_config(&self) -> Option<&CookieConfig>;
}

/// Rejection for requests that fail authentication. A bare 401: the client
/// learns nothing about why the token was rejected.
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

tokio::task_local! {
    /// Task-local slot for a refreshed token cookie.
    /// Written by the auth extractor, drained by [`apply_refreshed_cookie`].
    pub static REFRESHED_COOKIE: RefCell<Option<String>>;
}

/// Response middleware that appends the refreshed token cookie, if the auth
/// extractor produced one during this request.
pub async fn apply_refreshed_cookie(request: Request, next: Next) -> Response {
    REFRESHED_COOKIE
        .scope(RefCell::new(None), async move {
            let mut response = next.run(request).await;
            let cookie = REFRESHED_COOKIE.with(|cell| cell.borrow_mut().take());
            if let Some(cookie) = cookie {
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        response.headers_mut().append(header::SET_COOKIE, value);
                    }
                    Err(e) => tracing::warn!(error = %e, "Refreshed cookie value not writable"),
                }
            }
            response
        })
        .await
}

/// Extractor gating every protected endpoint: extracts the credential,
/// validates it, and hands the verified identity to the handler. Tokens
/// presented via cookie additionally go through sliding refresh.
pub struct RequireAuth(pub UserInfo);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = Unauthorized;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some((token, source)) = extract_token(&parts.headers, state.cookie_config()) else {
            tracing::info!("No token found in Authorization header or cookie");
            return Err(Unauthorized);
        };

        let user = match state.jwt().parse_token(token) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Token rejected");
                return Err(Unauthorized);
            }
        };

        // Correlate request logs with the authenticated user. Best-effort:
        // spans without a user_id field ignore the record.
        tracing::Span::current().record("user_id", user.user_id);

        if source == TokenSource::Cookie {
            sliding_refresh(state, &user);
        }

        Ok(RequireAuth(user))
    }
}

/// Reissue a cookie-sourced token nearing expiry. A refresh failure is
/// logged and swallowed: the request already holds a valid token.
fn sliding_refresh<S: HasAuthState>(state: &S, user: &UserInfo) {
    let Some(config) = state.cookie_config() else {
        return;
    };

    match state
        .jwt()
        .refresh_token(&user.login_id, user.user_id, user.expires_at)
    {
        Ok(Some(token)) => {
            let cookie = config.set_cookie_value(&token, state.jwt().ttl_secs());
            let _ = REFRESHED_COOKIE.try_with(|cell| {
                cell.borrow_mut().replace(cookie);
            });
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Token refresh failed"),
    }
}
