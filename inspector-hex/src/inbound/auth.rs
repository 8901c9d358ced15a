//! Session middleware.
//!
//! Resolves the `token` cookie to a user (reloaded from the repository on every
//! request so status changes apply immediately) and enforces the route gates:
//! - public routes pass through untouched,
//! - blocked users only reach `/api/auth/me`,
//! - `/api/admin/*` needs an admin user and, except for login/logout, a valid
//!   `admin_session` cookie.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use inspector_types::{AppError, DashboardRepository};

use super::handlers::{AppState, CurrentUser, error_response};
use super::session::{ADMIN_COOKIE, extract_cookie, extract_token};

pub const BLOCKED_MESSAGE: &str =
    "Your account has been blocked by an administrator. Please contact support for assistance.";

/// How a path is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Public,
    /// Signed in; blocked users allowed
    Identity,
    /// Signed in and active
    User,
    /// Admin user without the admin session (admin login/logout)
    AdminUser,
    /// Admin user with a valid admin session
    AdminSession,
}

pub fn gate_for(method: &Method, path: &str) -> Gate {
    const PUBLIC: [&str; 5] = [
        "/api/site",
        "/api/auth/signup-status",
        "/api/auth/signup",
        "/api/auth/login",
        "/api/auth/logout",
    ];

    if *method == Method::OPTIONS || !path.starts_with("/api/") || PUBLIC.contains(&path) {
        return Gate::Public;
    }
    match path {
        "/api/auth/me" => Gate::Identity,
        "/api/admin/login" | "/api/admin/logout" => Gate::AdminUser,
        p if p.starts_with("/api/admin/") || p == "/api/admin" => Gate::AdminSession,
        _ => Gate::User,
    }
}

fn rejection(err: AppError) -> Response {
    let status = match err {
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

pub async fn session_middleware<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let gate = gate_for(request.method(), request.uri().path());
    if gate == Gate::Public {
        return next.run(request).await;
    }

    let Some(user_id) =
        extract_token(request.headers()).and_then(|t| state.sessions.verify_token(t))
    else {
        return rejection(AppError::Unauthorized("Not authenticated.".into()));
    };

    let user = match state.service.repo().get_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            // Token outlived its user.
            return rejection(AppError::Unauthorized("Not authenticated.".into()));
        }
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    if gate != Gate::Identity && user.is_blocked() {
        return rejection(AppError::Forbidden(BLOCKED_MESSAGE.into()));
    }

    if matches!(gate, Gate::AdminUser | Gate::AdminSession) && !user.is_admin {
        tracing::warn!(user_id = %user.id, "Non-admin user hit an admin route");
        return rejection(AppError::Forbidden("Admin access required.".into()));
    }

    if gate == Gate::AdminSession {
        let unlocked = extract_cookie(request.headers(), ADMIN_COOKIE)
            .is_some_and(|v| state.sessions.verify_admin_session(v));
        if !unlocked {
            return rejection(AppError::Unauthorized(
                "Admin session expired. Please log in to the admin panel.".into(),
            ));
        }
    }

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        assert_eq!(gate_for(&Method::GET, "/health"), Gate::Public);
        assert_eq!(gate_for(&Method::GET, "/swagger-ui/index.html"), Gate::Public);
        assert_eq!(gate_for(&Method::POST, "/api/auth/login"), Gate::Public);
        assert_eq!(gate_for(&Method::OPTIONS, "/api/sms/search"), Gate::Public);
    }

    #[test]
    fn test_user_and_admin_paths() {
        assert_eq!(gate_for(&Method::GET, "/api/auth/me"), Gate::Identity);
        assert_eq!(gate_for(&Method::POST, "/api/sms/search"), Gate::User);
        assert_eq!(gate_for(&Method::POST, "/api/admin/login"), Gate::AdminUser);
        assert_eq!(gate_for(&Method::GET, "/api/admin/settings"), Gate::AdminSession);
        assert_eq!(
            gate_for(&Method::PUT, "/api/admin/users/abc/status"),
            Gate::AdminSession
        );
    }
}
