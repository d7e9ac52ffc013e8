use std::{env, net::SocketAddr, path::PathBuf};

use thiserror::Error;

use crate::models::user::normalize_email;

pub const DEFAULT_JWT_ISSUER: &str = "supportdesk";
pub const DEFAULT_JWT_AUDIENCE: &str = "supportdesk-web";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Token-bucket settings for the global and the `/api/auth` limiters.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub global_period_ms: u64,
    pub global_burst: u32,
    pub auth_period_secs: u64,
    pub auth_burst: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            global_period_ms: 200,
            global_burst: 20,
            auth_period_secs: 1,
            auth_burst: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    /// Appended to `frontend_origin`; the verification token follows it.
    pub email_verification_path: String,
    /// Bootstrap admin address, already normalized. Seeds the role of a
    /// brand-new user only.
    pub admin_email: Option<String>,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub auth_cookie_secure: bool,
    pub upload_dir: PathBuf,
    pub upload_public_base_url: String,
    pub bind_addr: SocketAddr,
    pub rate_limits: RateLimits,
    pub log_format: LogFormat,
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::Missing(var))
}

fn parse_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = required("DATABASE_URL")?;
        let frontend_origin = required("FRONTEND_ORIGIN")?;

        let email_verification_path = env::var("EMAIL_VERIFICATION_PATH")
            .unwrap_or_else(|_| "/verify-email?token=".into());

        let admin_email = env::var("ADMIN_EMAIL")
            .ok()
            .map(|email| normalize_email(&email))
            .filter(|email| !email.is_empty());

        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_JWT_ISSUER.to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_JWT_AUDIENCE.to_string());

        let upload_dir = PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()));
        let upload_public_base_url = env::var("UPLOAD_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "/uploads".into())
            .trim_end_matches('/')
            .to_string();

        let log_format = match env::var("LOG_FORMAT").ok().as_deref() {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        let defaults = RateLimits::default();
        let rate_limits = RateLimits {
            global_period_ms: parse_or("RATE_LIMITER_MILLISECONDS", defaults.global_period_ms)?,
            global_burst: parse_or("RATE_LIMITER_BURST", defaults.global_burst)?,
            auth_period_secs: parse_or("RATE_LIMITER_AUTH_SECONDS", defaults.auth_period_secs)?,
            auth_burst: parse_or("RATE_LIMITER_AUTH_BURST", defaults.auth_burst)?,
        };

        Ok(Config {
            database_url,
            frontend_origin,
            email_verification_path,
            admin_email,
            jwt_issuer,
            jwt_audience,
            auth_cookie_secure: parse_or("AUTH_COOKIE_SECURE", true)?,
            upload_dir,
            upload_public_base_url,
            bind_addr: parse_or("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            rate_limits,
            log_format,
        })
    }

    /// Prefix of the link sent in verification mails.
    pub fn verification_link_base(&self) -> String {
        format!(
            "{}{}",
            self.frontend_origin.trim_end_matches('/'),
            self.email_verification_path
        )
    }

    /// True when `email` is the configured bootstrap admin address.
    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin == normalize_email(email))
    }
}

#[cfg(test)]
impl Config {
    pub fn test_config() -> Self {
        Config {
            database_url: "postgres://localhost/supportdesk_test".into(),
            frontend_origin: "http://localhost:5173".into(),
            email_verification_path: "/verify-email?token=".into(),
            admin_email: Some("admin@example.com".into()),
            jwt_issuer: DEFAULT_JWT_ISSUER.into(),
            jwt_audience: DEFAULT_JWT_AUDIENCE.into(),
            auth_cookie_secure: false,
            upload_dir: std::env::temp_dir().join("supportdesk-test-uploads"),
            upload_public_base_url: "http://localhost:3000/uploads".into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            rate_limits: RateLimits::default(),
            log_format: LogFormat::Text,
        }
    }
}
