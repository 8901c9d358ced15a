//! Rate limiting middleware using Governor.
//!
//! One token bucket per signed-in user; requests without a valid session share
//! a bucket per forwarded client address.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DashMapStateStore};
use std::{num::NonZeroU32, sync::Arc};

use super::session::{SessionManager, extract_token};

type KeyedLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// Buckets kept before idle ones are dropped.
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    limiter: KeyedLimiter,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::per_minute(120)
    }
}

impl RateLimiterState {
    /// `requests` per minute, all of which may be spent in a burst. Zero is treated as one.
    pub fn per_minute(requests: u32) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::dashmap(Quota::per_minute(burst)),
        }
    }

    /// Returns true if the request is allowed.
    pub fn check(&self, key: &str) -> bool {
        if self.limiter.len() >= PRUNE_THRESHOLD {
            self.prune();
        }
        self.limiter.check_key(&key.to_string()).is_ok()
    }

    /// Drops buckets that have refilled completely.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }
}

/// Verified user id when the session token checks out, else the client address.
fn client_key(request: &Request<Body>, sessions: &SessionManager) -> String {
    let verified = extract_token(request.headers()).and_then(|t| sessions.verify_token(t));
    if let Some(user_id) = verified {
        return format!("user:{}", user_id);
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|ip| format!("ip:{}", ip.trim()))
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rate_limit_middleware(
    State((limiter, sessions)): State<(Arc<RateLimiterState>, SessionManager)>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    if !limiter.check(&client_key(&request, &sessions)) {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(serde_json::json!({
                "error": "Rate limit exceeded. Please try again later.",
                "code": 429,
                "retry_after_seconds": 60
            })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{AUTHORIZATION, COOKIE};
    use inspector_types::User;

    #[test]
    fn test_bucket_per_key() {
        let state = RateLimiterState::per_minute(2);

        assert!(state.check("a"));
        assert!(state.check("a"));
        assert!(!state.check("a"));
        assert!(state.check("b"));
    }

    #[test]
    fn test_zero_quota_still_allows_one() {
        let state = RateLimiterState::per_minute(0);
        assert!(state.check("a"));
        assert!(!state.check("a"));
    }

    #[test]
    fn test_prune_keeps_spent_buckets() {
        let state = RateLimiterState::per_minute(2);
        state.check("spent");
        state.check("spent");
        assert_eq!(state.limiter.len(), 1);

        state.prune();
        assert!(!state.check("spent"));
    }

    #[test]
    fn test_forged_token_falls_back_to_address() {
        let sessions = SessionManager::new("secret", false);
        let request = Request::builder()
            .header(COOKIE, "token=forged-1")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request, &sessions), "ip:203.0.113.9");

        let request = Request::builder()
            .header(AUTHORIZATION, "Bearer forged-2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request, &sessions), "anonymous");
    }

    #[test]
    fn test_valid_session_is_keyed_by_user() {
        let sessions = SessionManager::new("secret", false);
        let user = User::new("Alice".into(), "alice@example.com".into(), "hash".into()).unwrap();
        let token = sessions.issue_token(&user).unwrap();

        let request = Request::builder()
            .header(COOKIE, format!("token={}", token))
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request, &sessions), format!("user:{}", user.id));
    }
}
