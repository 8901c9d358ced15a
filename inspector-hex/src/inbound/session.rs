//! Session tokens and cookies.
//!
//! Two cookies gate the dashboard:
//! - `token`: HS256 JWT naming the user, valid one day, path `/`.
//! - `admin_session`: `<expires_at>.<hmac>` unlocking the admin panel for one
//!   hour, path `/api/admin`.

use axum::http::{HeaderMap, header::COOKIE};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use inspector_repo::security;
use inspector_types::{AppError, User, UserId};

pub const USER_COOKIE: &str = "token";
pub const ADMIN_COOKIE: &str = "admin_session";
pub const ADMIN_COOKIE_PATH: &str = "/api/admin";

pub const USER_SESSION_SECS: i64 = 60 * 60 * 24;
pub const ADMIN_SESSION_SECS: i64 = 60 * 60;

/// JWT claims of a user session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and checks both session kinds.
#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    secret: String,
    secure_cookies: bool,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("secret", &"[REDACTED]")
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

impl SessionManager {
    pub fn new(secret: &str, secure_cookies: bool) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            secret: secret.to_string(),
            secure_cookies,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // User session
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn issue_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            is_admin: user.is_admin,
            iat: now,
            exp: now + USER_SESSION_SECS,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign session: {}", e)))
    }

    /// The user named by a valid, unexpired token.
    pub fn verify_token(&self, token: &str) -> Option<UserId> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| tracing::debug!("Rejected session token: {}", e))
            .ok()?;
        data.claims.sub.parse().ok()
    }

    pub fn user_cookie(&self, token: &str) -> String {
        self.build_cookie(USER_COOKIE, token, "/", USER_SESSION_SECS)
    }

    pub fn clear_user_cookie(&self) -> String {
        self.build_cookie(USER_COOKIE, "", "/", 0)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Admin session
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn issue_admin_session(&self) -> String {
        security::sign_admin_session(&self.secret, Utc::now().timestamp() + ADMIN_SESSION_SECS)
    }

    pub fn verify_admin_session(&self, value: &str) -> bool {
        security::verify_admin_session(&self.secret, value, Utc::now().timestamp())
    }

    pub fn admin_cookie(&self, value: &str) -> String {
        self.build_cookie(ADMIN_COOKIE, value, ADMIN_COOKIE_PATH, ADMIN_SESSION_SECS)
    }

    pub fn clear_admin_cookie(&self) -> String {
        self.build_cookie(ADMIN_COOKIE, "", ADMIN_COOKIE_PATH, 0)
    }

    fn build_cookie(&self, name: &str, value: &str, path: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Strict",
            name, value, path, max_age
        );
        if max_age == 0 {
            cookie.push_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        }
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Reads a cookie value from the request headers.
pub fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
        .filter(|v| !v.is_empty())
}

/// Session token from the `token` cookie, or from a `Bearer` header for API clients.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    extract_cookie(headers, USER_COOKIE).or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}
