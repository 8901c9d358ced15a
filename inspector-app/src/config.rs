//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use rand::{Rng, distr::Alphanumeric};

use inspector_hex::outbound::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

const GENERATED_SECRET_LEN: usize = 48;

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    /// No `JWT_SECRET` was set; sessions die with the process.
    pub jwt_secret_generated: bool,
    pub admin_username: String,
    pub admin_password: String,
    pub seed_admin_email: String,
    pub seed_admin_password: String,
    pub premiumy_api_url: String,
    pub premiumy_api_key: Option<String>,
    pub proxy_probe_url: String,
    pub upstream_timeout: Duration,
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub secure_cookies: bool,
    pub rate_limit_per_minute: u32,
    pub cors_allowed_origins: Vec<String>,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = or("PORT", "3000")
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT is not a valid port: {}", e))?;

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let (jwt_secret, jwt_secret_generated) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (random_secret(), true),
        };

        let upstream_timeout = or("UPSTREAM_TIMEOUT_SECS", "30")
            .parse()
            .map(Duration::from_secs)
            .map_err(|e| {
                anyhow::anyhow!("UPSTREAM_TIMEOUT_SECS must be a number of seconds: {}", e)
            })?;

        let rate_limit_per_minute = or("RATE_LIMIT_PER_MINUTE", "120")
            .parse()
            .map_err(|e| anyhow::anyhow!("RATE_LIMIT_PER_MINUTE must be a number: {}", e))?;

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port,
            database_url,
            jwt_secret,
            jwt_secret_generated,
            admin_username: or("ADMIN_USERNAME", "admin"),
            admin_password: or("ADMIN_PASSWORD", "admin"),
            seed_admin_email: or("SEED_ADMIN_EMAIL", "admin@example.com"),
            seed_admin_password: or("SEED_ADMIN_PASSWORD", "admin"),
            premiumy_api_url: or("PREMIUMY_API_URL", premiumy::DEFAULT_API_URL),
            premiumy_api_key: get("PREMIUMY_API_KEY"),
            proxy_probe_url: or("PROXY_PROBE_URL", premiumy::DEFAULT_PROBE_URL),
            upstream_timeout,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_api_url: or("GEMINI_API_URL", DEFAULT_GEMINI_BASE_URL),
            gemini_model: or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            secure_cookies: parse_flag(get("SECURE_COOKIES").as_deref()),
            rate_limit_per_minute,
            cors_allowed_origins,
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// The admin panel still uses the built-in password.
    pub fn default_admin_password(&self) -> bool {
        self.admin_password == "admin"
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn random_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect()
}
