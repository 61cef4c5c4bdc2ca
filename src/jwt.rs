//! JWT token generation, validation, and sliding refresh.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Value of the `iss` and `aud` claims identifying this service.
pub const TOKEN_ISSUER: &str = "todolite";

/// Value of the `sub` claim on every issued token.
pub const TOKEN_SUBJECT: &str = "AccessToken";

/// JWT claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Human-readable login identifier
    #[serde(rename = "loginId")]
    pub login_id: String,
    /// Numeric user identifier
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Issuer
    pub iss: String,
    /// Subject
    pub sub: String,
    /// Audience
    pub aud: String,
    /// Not valid before (Unix timestamp)
    pub nbf: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// An authenticated principal derived from a verified token.
#[derive(Debug, Clone)]
pub struct UserInfo {
    /// Numeric user identifier, always positive
    pub user_id: i64,
    /// Human-readable login identifier, never empty
    pub login_id: String,
    /// Expiry of the token this identity was derived from (Unix timestamp)
    pub expires_at: u64,
}

impl UserInfo {
    /// Build a validated identity. Rejects non-positive user IDs, empty
    /// login IDs, and unset expiries.
    pub fn new(user_id: i64, login_id: String, expires_at: u64) -> Result<Self, JwtError> {
        if user_id <= 0 {
            return Err(JwtError::InvalidClaims("user ID must be positive"));
        }
        if login_id.is_empty() {
            return Err(JwtError::InvalidClaims("login ID must not be empty"));
        }
        if expires_at == 0 {
            return Err(JwtError::InvalidClaims("expiry must be set"));
        }
        Ok(Self {
            user_id,
            login_id,
            expires_at,
        })
    }
}

/// Issues a signed token for a user identity.
pub trait TokenCreator {
    fn create_token(&self, login_id: &str, user_id: i64) -> Result<String, JwtError>;
}

/// Verifies a token string and extracts the embedded identity.
pub trait TokenParser {
    fn parse_token(&self, token: &str) -> Result<UserInfo, JwtError>;
}

/// Decides whether a still-valid token should be reissued, and does so.
pub trait TokenRefresher {
    /// Returns `Ok(None)` when the token's remaining lifetime is above the
    /// refresh threshold, otherwise a freshly signed token with the full TTL.
    fn refresh_token(
        &self,
        login_id: &str,
        user_id: i64,
        expires_at: u64,
    ) -> Result<Option<String>, JwtError>;
}

/// Configuration for JWT operations. Sole holder of the signing key.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
    refresh_threshold_secs: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret, token TTL, and
    /// sliding-refresh threshold.
    pub fn new(secret: &[u8], ttl: Duration, refresh_threshold: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs: ttl.as_secs(),
            refresh_threshold_secs: refresh_threshold.as_secs(),
        }
    }

    /// Token TTL in seconds, the Max-Age of cookie-delivered tokens.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    fn now() -> Result<u64, JwtError> {
        Ok(SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs())
    }

    fn create_jwt(&self, login_id: &str, user_id: i64) -> Result<String, JwtError> {
        let now = Self::now()?;

        let claims = Claims {
            login_id: login_id.to_string(),
            user_id,
            iss: TOKEN_ISSUER.to_string(),
            sub: TOKEN_SUBJECT.to_string(),
            aud: TOKEN_ISSUER.to_string(),
            nbf: now,
            iat: now,
            exp: now + self.ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Accept any HMAC algorithm, reject everything else. A token
        // asserting e.g. RS256 must not reach signature verification.
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_ISSUER]);
        validation
    }
}

impl TokenCreator for JwtConfig {
    fn create_token(&self, login_id: &str, user_id: i64) -> Result<String, JwtError> {
        self.create_jwt(login_id, user_id)
    }
}

impl TokenParser for JwtConfig {
    fn parse_token(&self, token: &str) -> Result<UserInfo, JwtError> {
        let token_data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Self::validation())
                .map_err(JwtError::Decoding)?;

        let claims = token_data.claims;
        UserInfo::new(claims.user_id, claims.login_id, claims.exp)
    }
}

impl TokenRefresher for JwtConfig {
    fn refresh_token(
        &self,
        login_id: &str,
        user_id: i64,
        expires_at: u64,
    ) -> Result<Option<String>, JwtError> {
        let now = Self::now()?;
        let remaining = expires_at.saturating_sub(now);
        if remaining > self.refresh_threshold_secs {
            return Ok(None);
        }

        let token = self.create_jwt(login_id, user_id)?;
        Ok(Some(token))
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token (bad signature, wrong algorithm, expired,
    /// not yet valid, malformed structure)
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Structurally valid token with unusable claims
    InvalidClaims(&'static str),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::InvalidClaims(reason) => write!(f, "Invalid token claims: {}", reason),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig::new(
            b"test-secret-key-for-testing",
            Duration::from_secs(60 * 60),
            Duration::from_secs(30 * 60),
        )
    }

    fn unix_now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn claims(user_id: i64, nbf: u64, iat: u64, exp: u64) -> Claims {
        Claims {
            login_id: "user1".to_string(),
            user_id,
            iss: TOKEN_ISSUER.to_string(),
            sub: TOKEN_SUBJECT.to_string(),
            aud: TOKEN_ISSUER.to_string(),
            nbf,
            iat,
            exp,
        }
    }

    #[test]
    fn test_create_and_parse_roundtrip() {
        let config = test_config();
        let before = unix_now();

        let token = config.create_token("user42", 42).unwrap();
        let info = config.parse_token(&token).unwrap();

        assert_eq!(info.user_id, 42);
        assert_eq!(info.login_id, "user42");
        assert!(info.expires_at >= before + config.ttl_secs());
        assert!(info.expires_at <= unix_now() + config.ttl_secs());
    }

    #[test]
    fn test_invalid_token() {
        let config = test_config();
        assert!(config.parse_token("not-a-token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = test_config();
        let config2 = JwtConfig::new(
            b"a-different-secret-entirely",
            Duration::from_secs(60 * 60),
            Duration::from_secs(30 * 60),
        );

        let token = config1.create_token("user1", 1).unwrap();
        assert!(config2.parse_token(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let config = test_config();
        let now = unix_now();

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims(1, now - 100, now - 100, now - 50),
            &EncodingKey::from_secret(b"test-secret-key-for-testing"),
        )
        .unwrap();

        assert!(config.parse_token(&token).is_err());
    }

    #[test]
    fn test_not_yet_valid_token() {
        let config = test_config();
        let now = unix_now();

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims(1, now + 100, now, now + 200),
            &EncodingKey::from_secret(b"test-secret-key-for-testing"),
        )
        .unwrap();

        assert!(config.parse_token(&token).is_err());
    }

    #[test]
    fn test_hmac_family_accepted() {
        let config = test_config();
        let now = unix_now();

        // HS512 is a different HMAC variant, still within the allowed family.
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims(3, now, now, now + 600),
            &EncodingKey::from_secret(b"test-secret-key-for-testing"),
        )
        .unwrap();

        let info = config.parse_token(&token).unwrap();
        assert_eq!(info.user_id, 3);
    }

    #[test]
    fn test_non_hmac_algorithm_rejected() {
        let config = test_config();
        let token = config.create_token("user1", 1).unwrap();

        // Swap the header for one asserting RS256:
        // base64url of {"alg":"RS256","typ":"JWT"}
        let mut parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        parts[0] = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9";
        let forged = parts.join(".");

        assert!(config.parse_token(&forged).is_err());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let config = test_config();
        let token = config.create_token("user1", 1).unwrap();

        let mut forged = token[..token.len() - 2].to_string();
        forged.push_str("xx");
        assert!(config.parse_token(&forged).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let config = test_config();
        let now = unix_now();

        let mut bad = claims(1, now, now, now + 600);
        bad.iss = "someone-else".to_string();
        let token = jsonwebtoken::encode(
            &Header::default(),
            &bad,
            &EncodingKey::from_secret(b"test-secret-key-for-testing"),
        )
        .unwrap();

        assert!(config.parse_token(&token).is_err());
    }

    #[test]
    fn test_non_positive_user_id_rejected() {
        let config = test_config();
        let now = unix_now();

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims(0, now, now, now + 600),
            &EncodingKey::from_secret(b"test-secret-key-for-testing"),
        )
        .unwrap();

        assert!(matches!(
            config.parse_token(&token),
            Err(JwtError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_refresh_not_needed_above_threshold() {
        let config = test_config();
        let expires_at = unix_now() + 45 * 60; // threshold is 30 min

        let result = config.refresh_token("user1", 1, expires_at).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_refresh_issued_at_or_below_threshold() {
        let config = test_config();
        let expires_at = unix_now() + 10 * 60;

        let token = config
            .refresh_token("user1", 1, expires_at)
            .unwrap()
            .expect("token near expiry should refresh");

        // The replacement carries a full TTL, not the remaining time.
        let info = config.parse_token(&token).unwrap();
        assert_eq!(info.user_id, 1);
        assert!(info.expires_at > expires_at);
    }

    #[test]
    fn test_refresh_of_already_expired_claims() {
        let config = test_config();
        // Expiry in the past: remaining saturates to zero, which is below
        // the threshold, so a fresh token is issued.
        let result = config.refresh_token("user1", 1, unix_now() - 10).unwrap();
        assert!(result.is_some());
    }

    #[test]
    fn test_user_info_validation() {
        assert!(UserInfo::new(1, "user1".to_string(), 100).is_ok());
        assert!(UserInfo::new(0, "user1".to_string(), 100).is_err());
        assert!(UserInfo::new(-5, "user1".to_string(), 100).is_err());
        assert!(UserInfo::new(1, String::new(), 100).is_err());
        assert!(UserInfo::new(1, "user1".to_string(), 0).is_err());
    }
}
