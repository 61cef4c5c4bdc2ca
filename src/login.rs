//! Demonstrative credential validation.
//!
//! Stands in for a real credential store: a login ID `user<N>` paired with
//! password `password<M>` authenticates when N == M, and N becomes the user
//! ID. A production deployment replaces [`authenticate`] with a store lookup
//! while keeping the same contract: one success path yielding a token, one
//! failure kind for every rejection.

use regex::Regex;
use std::sync::LazyLock;

use crate::jwt::{JwtError, TokenCreator};

static LOGIN_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^user(\d+)$").expect("valid login ID pattern"));

static PASSWORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^password(\d+)$").expect("valid password pattern"));

/// Errors from the authentication flow.
#[derive(Debug)]
pub enum LoginError {
    /// Credential rejection. Deliberately carries no detail about which part
    /// of the credential was wrong.
    Unauthenticated,
    /// Token issuance failed after the credentials were accepted
    TokenCreation(JwtError),
}

impl std::fmt::Display for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginError::Unauthenticated => write!(f, "Invalid login ID or password"),
            LoginError::TokenCreation(e) => write!(f, "Failed to create token: {}", e),
        }
    }
}

impl std::error::Error for LoginError {}

/// Validate a login/password pair and issue a signed token for the resolved
/// identity.
pub fn authenticate(
    creator: &impl TokenCreator,
    login_id: &str,
    password: &str,
) -> Result<String, LoginError> {
    let user_id = check_credentials(login_id, password)?;
    creator
        .create_token(login_id, user_id)
        .map_err(LoginError::TokenCreation)
}

/// Match the credential patterns and resolve the user ID.
/// Format mismatches and value mismatches are indistinguishable to callers.
fn check_credentials(login_id: &str, password: &str) -> Result<i64, LoginError> {
    let login_num = LOGIN_ID_PATTERN
        .captures(login_id)
        .and_then(|c| c.get(1))
        .ok_or(LoginError::Unauthenticated)?
        .as_str();

    let password_num = PASSWORD_PATTERN
        .captures(password)
        .and_then(|c| c.get(1))
        .ok_or(LoginError::Unauthenticated)?
        .as_str();

    if login_num != password_num {
        return Err(LoginError::Unauthenticated);
    }

    login_num
        .parse::<i64>()
        .map_err(|_| LoginError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{JwtConfig, TokenParser};
    use std::time::Duration;

    fn test_jwt() -> JwtConfig {
        JwtConfig::new(
            b"test-secret-key-for-testing",
            Duration::from_secs(3600),
            Duration::from_secs(1800),
        )
    }

    #[test]
    fn test_matching_credentials_succeed() {
        let jwt = test_jwt();
        let token = authenticate(&jwt, "user1", "password1").unwrap();
        let info = jwt.parse_token(&token).unwrap();
        assert_eq!(info.user_id, 1);
        assert_eq!(info.login_id, "user1");
    }

    #[test]
    fn test_multi_digit_user_id() {
        let jwt = test_jwt();
        let token = authenticate(&jwt, "user123", "password123").unwrap();
        assert_eq!(jwt.parse_token(&token).unwrap().user_id, 123);
    }

    #[test]
    fn test_mismatched_numbers_fail() {
        let jwt = test_jwt();
        assert!(matches!(
            authenticate(&jwt, "user1", "password2"),
            Err(LoginError::Unauthenticated)
        ));
    }

    #[test]
    fn test_bad_login_format_fails() {
        let jwt = test_jwt();
        assert!(matches!(
            authenticate(&jwt, "admin", "password1"),
            Err(LoginError::Unauthenticated)
        ));
        assert!(matches!(
            authenticate(&jwt, "user", "password1"),
            Err(LoginError::Unauthenticated)
        ));
        assert!(matches!(
            authenticate(&jwt, "user1x", "password1"),
            Err(LoginError::Unauthenticated)
        ));
    }

    #[test]
    fn test_bad_password_format_fails() {
        let jwt = test_jwt();
        assert!(matches!(
            authenticate(&jwt, "user1", "whatever"),
            Err(LoginError::Unauthenticated)
        ));
        assert!(matches!(
            authenticate(&jwt, "user1", "password"),
            Err(LoginError::Unauthenticated)
        ));
    }

    #[test]
    fn test_empty_credentials_fail() {
        let jwt = test_jwt();
        assert!(matches!(
            authenticate(&jwt, "", ""),
            Err(LoginError::Unauthenticated)
        ));
    }
}
