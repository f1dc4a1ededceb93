//!
//! surveyd configuration
//! ---------------------
//! Resolves the service configuration from environment variables. The binary
//! layers command-line overrides on top; tests build configs through
//! `ServiceConfig::from_lookup` with a map instead of the process environment.
//!
//! Every collaborator here is optional: an unset webhook URL disables the
//! notifier, an unset properties URL makes `/properties.json` answer `[]`, and
//! an unset signing secret falls back to a placeholder that startup warns about.

use std::time::Duration;

use reqwest::Url;

use crate::error::{AppError, AppResult};

pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_DATABASE_URL: &str = "memory://";
/// Placeholder secret used when `JWT_SECRET` is unset. Never acceptable outside local development.
pub const DEFAULT_JWT_SECRET: &str = "JWT_SECRET";
pub const DEFAULT_WEBHOOK_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PROPERTIES_TIMEOUT_MS: u64 = 10_000;

pub const ENV_PORT: &str = "PORT";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";
pub const ENV_ANSWER_WEBHOOK_URL: &str = "ANSWER_WEBHOOK_URL";
pub const ENV_ANSWER_WEBHOOK_TIMEOUT_MS: &str = "ANSWER_WEBHOOK_TIMEOUT_MS";
pub const ENV_PROPERTIES_URL: &str = "PROPERTIES_URL";
pub const ENV_PROPERTIES_TIMEOUT_MS: &str = "PROPERTIES_TIMEOUT_MS";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub http_port: u16,
    /// Entity store location; the scheme selects the backend.
    pub database_url: String,
    pub jwt_secret: String,
    pub answer_webhook_url: Option<Url>,
    pub webhook_timeout: Duration,
    pub properties_url: Option<Url>,
    pub properties_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            answer_webhook_url: None,
            webhook_timeout: Duration::from_millis(DEFAULT_WEBHOOK_TIMEOUT_MS),
            properties_url: None,
            properties_timeout: Duration::from_millis(DEFAULT_PROPERTIES_TIMEOUT_MS),
        }
    }
}

impl ServiceConfig {
    /// Build from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = ServiceConfig::default();

        if let Some(raw) = get(ENV_PORT) {
            cfg.http_port = raw
                .parse::<u16>()
                .map_err(|_| AppError::config("invalid_port", format!("{ENV_PORT} is not a valid port: {raw}")))?;
        }
        if let Some(url) = get(ENV_DATABASE_URL) { cfg.database_url = url; }
        if let Some(secret) = get(ENV_JWT_SECRET) { cfg.jwt_secret = secret; }
        cfg.answer_webhook_url = get(ENV_ANSWER_WEBHOOK_URL).map(|u| parse_url(ENV_ANSWER_WEBHOOK_URL, &u)).transpose()?;
        if let Some(raw) = get(ENV_ANSWER_WEBHOOK_TIMEOUT_MS) {
            cfg.webhook_timeout = parse_timeout(ENV_ANSWER_WEBHOOK_TIMEOUT_MS, &raw)?;
        }
        cfg.properties_url = get(ENV_PROPERTIES_URL).map(|u| parse_url(ENV_PROPERTIES_URL, &u)).transpose()?;
        if let Some(raw) = get(ENV_PROPERTIES_TIMEOUT_MS) {
            cfg.properties_timeout = parse_timeout(ENV_PROPERTIES_TIMEOUT_MS, &raw)?;
        }
        Ok(cfg)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// One-line summary safe to log: the secret is never included.
    pub fn redacted_summary(&self) -> String {
        format!(
            "http_port={}, database={}, secret={}, answer_webhook={}, webhook_timeout_ms={}, properties={}, properties_timeout_ms={}",
            self.http_port,
            redact_database_url(&self.database_url),
            if self.uses_default_secret() { "<default>" } else { "<set>" },
            self.answer_webhook_url.as_ref().map(|u| u.as_str()).unwrap_or("<unset>"),
            self.webhook_timeout.as_millis(),
            self.properties_url.as_ref().map(|u| u.as_str()).unwrap_or("<unset>"),
            self.properties_timeout.as_millis(),
        )
    }
}

/// Whole milliseconds, at least 1.
fn parse_timeout(var: &str, raw: &str) -> AppResult<Duration> {
    match raw.parse::<u64>() {
        Ok(0) => Err(AppError::config("invalid_timeout", format!("{var} must be greater than zero"))),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(_) => Err(AppError::config("invalid_timeout", format!("{var} is not a number of milliseconds: {raw}"))),
    }
}

fn parse_url(var: &str, raw: &str) -> AppResult<Url> {
    let url = Url::parse(raw).map_err(|e| AppError::config("invalid_url", format!("{var} is not a valid URL ({e}): {raw}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::config("invalid_url", format!("{var} must use http or https, got '{other}'"))),
    }
}

/// Strip credentials from a store URL before it reaches the logs.
fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut u) if !u.username().is_empty() || u.password().is_some() => {
            let _ = u.set_username("***");
            let _ = u.set_password(None);
            u.to_string()
        }
        _ => raw.to_string(),
    }
}
