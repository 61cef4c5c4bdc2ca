//! CLI argument parsing, validation, and startup helpers.

use clap::Parser;
use std::time::Duration;
use tracing::error;

use crate::ServerConfig;
use crate::auth::{CookieConfig, SameSite};
use crate::db::Database;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
pub enum CookieSameSite {
    #[default]
    Lax,
    Strict,
}

impl From<CookieSameSite> for SameSite {
    fn from(value: CookieSameSite) -> Self {
        match value {
            CookieSameSite::Lax => SameSite::Lax,
            CookieSameSite::Strict => SameSite::Strict,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "todolite", about = "Multi-user todo-list REST backend")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "todolite.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in minutes
    #[arg(long, default_value = "60")]
    pub token_ttl_min: u64,

    /// Remaining lifetime below which a cookie-delivered token is reissued, in minutes
    #[arg(long, default_value = "30")]
    pub refresh_threshold_min: u64,

    /// Disable the cookie delivery channel
    #[arg(long)]
    pub no_cookie: bool,

    /// Name of the access token cookie
    #[arg(long, default_value = "access_token")]
    pub cookie_name: String,

    /// Path attribute of the access token cookie
    #[arg(long, default_value = "/")]
    pub cookie_path: String,

    /// Set the Secure flag on the access token cookie (requires HTTPS)
    #[arg(long)]
    pub cookie_secure: bool,

    /// SameSite attribute of the access token cookie
    #[arg(long, default_value = "lax")]
    pub cookie_same_site: CookieSameSite,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Validate the token TTL / refresh threshold relationship.
/// A threshold above the TTL would reissue the token on every
/// cookie-authenticated request.
pub fn validate_token_config(token_ttl_min: u64, refresh_threshold_min: u64) -> bool {
    if token_ttl_min == 0 {
        error!("token-ttl-min must be at least 1");
        return false;
    }

    if refresh_threshold_min > token_ttl_min {
        error!(
            token_ttl_min,
            refresh_threshold_min,
            "refresh-threshold-min must not exceed token-ttl-min"
        );
        return false;
    }

    true
}

/// Open the database at the given path.
/// Returns None and logs an error if opening fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => Some(db),
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Assemble the server configuration from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    let cookie = if args.no_cookie {
        None
    } else {
        Some(CookieConfig {
            name: args.cookie_name.clone(),
            path: args.cookie_path.clone(),
            secure: args.cookie_secure,
            same_site: args.cookie_same_site.into(),
        })
    };

    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        token_ttl: Duration::from_secs(args.token_ttl_min * 60),
        refresh_threshold: Duration::from_secs(args.refresh_threshold_min * 60),
        cookie,
    }
}
