//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use inspector_types::domain::{
    AdminSettings, ErrorMapping, ExtractedInfo, PhoneGroup, ProxySettings, Segment, SiteSettings,
    SmsRecord, UserId, UserProfile, UserStatus,
};
use inspector_types::dto::{
    AdminLoginRequest, AnalyzeResponse, LoginRequest, MessageRequest, NumberListInput,
    NumberListResponse, NumberPermissionRequest, NumbersRequest, SignupRequest,
    SignupStatusResponse, SmsSearchRequest, SmsSearchResponse, SuccessResponse, SummaryResponse,
    UpdateProfileRequest, UpdateSettingsRequest, UpdateSettingsResponse, UpdateUserStatusRequest,
    UserListResponse,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme},
};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

// ─────────────────────────────────────────────────────────────────────────────
// Public
// ─────────────────────────────────────────────────────────────────────────────

/// Site name, colour and feature flags
#[utoipa::path(
    get,
    path = "/api/site",
    tag = "site",
    responses((status = 200, description = "Public site settings", body = SiteSettings))
)]
async fn site_settings() {}

#[utoipa::path(
    get,
    path = "/api/auth/signup-status",
    tag = "auth",
    responses((status = 200, description = "Whether sign-up is open", body = SignupStatusResponse))
)]
async fn signup_status() {}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserProfile),
        (status = 400, description = "Invalid name, email or password"),
        (status = 403, description = "Sign-up is disabled"),
        (status = 409, description = "Email already registered")
    )
)]
async fn signup() {}

/// Sign in and receive the `token` cookie
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = UserProfile),
        (status = 401, description = "Invalid email or password")
    )
)]
async fn login() {}

/// Clear both session cookies
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Signed out", body = SuccessResponse))
)]
async fn logout() {}

// ─────────────────────────────────────────────────────────────────────────────
// Signed-in user
// ─────────────────────────────────────────────────────────────────────────────

/// The signed-in user (also answers for blocked accounts)
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("session_cookie" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Not authenticated")
    )
)]
async fn me() {}

#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "profile",
    request_body = UpdateProfileRequest,
    security(("session_cookie" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 403, description = "Email changes are disabled"),
        (status = 409, description = "Email already in use")
    )
)]
async fn update_profile() {}

/// Fetch SMS delivery records from the provider
#[utoipa::path(
    post,
    path = "/api/sms/search",
    tag = "sms",
    request_body = SmsSearchRequest,
    security(("session_cookie" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Matching records, flat and grouped", body = SmsSearchResponse),
        (status = 400, description = "Invalid filter"),
        (status = 403, description = "Account blocked"),
        (status = 502, description = "Provider error"),
        (status = 503, description = "Provider API key not configured")
    )
)]
async fn search_sms() {}

/// Extract the link and one-time code from a message
#[utoipa::path(
    post,
    path = "/api/sms/analyze",
    tag = "sms",
    request_body = MessageRequest,
    security(("session_cookie" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Extracted information", body = AnalyzeResponse),
        (status = 400, description = "Empty message")
    )
)]
async fn analyze_message() {}

#[utoipa::path(
    post,
    path = "/api/sms/summarize",
    tag = "sms",
    request_body = MessageRequest,
    security(("session_cookie" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "One-line summary", body = SummaryResponse),
        (status = 400, description = "Empty message")
    )
)]
async fn summarize_message() {}

#[utoipa::path(
    get,
    path = "/api/numbers",
    tag = "numbers",
    security(("session_cookie" = []), ("bearer_auth" = [])),
    responses((status = 200, description = "Shared number list", body = NumberListResponse))
)]
async fn list_numbers() {}

/// Append numbers to the shared list
#[utoipa::path(
    post,
    path = "/api/numbers",
    tag = "numbers",
    request_body = NumbersRequest,
    security(("session_cookie" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated number list", body = NumberListResponse),
        (status = 403, description = "Not allowed to add numbers")
    )
)]
async fn add_numbers() {}

// ─────────────────────────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────────────────────────

/// Unlock the admin panel and receive the `admin_session` cookie
#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "admin",
    request_body = AdminLoginRequest,
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "Admin panel unlocked", body = SuccessResponse),
        (status = 401, description = "Invalid admin credentials"),
        (status = 403, description = "Admin access required")
    )
)]
async fn admin_login() {}

#[utoipa::path(
    post,
    path = "/api/admin/logout",
    tag = "admin",
    security(("session_cookie" = [])),
    responses((status = 200, description = "Admin panel locked", body = SuccessResponse))
)]
async fn admin_logout() {}

/// All settings, including the provider key and proxy
#[utoipa::path(
    get,
    path = "/api/admin/settings",
    tag = "admin",
    security(("session_cookie" = [], "admin_session" = [])),
    responses(
        (status = 200, description = "Current settings", body = AdminSettings),
        (status = 401, description = "Admin session expired")
    )
)]
async fn get_settings() {}

/// Partially update settings; a new proxy is probed before anything is saved
#[utoipa::path(
    put,
    path = "/api/admin/settings",
    tag = "admin",
    request_body = UpdateSettingsRequest,
    security(("session_cookie" = [], "admin_session" = [])),
    responses(
        (status = 200, description = "Settings saved", body = UpdateSettingsResponse),
        (status = 400, description = "Invalid value or proxy test failed"),
        (status = 401, description = "Admin session expired")
    )
)]
async fn update_settings() {}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    security(("session_cookie" = [], "admin_session" = [])),
    responses((status = 200, description = "All users, newest first", body = UserListResponse))
)]
async fn list_users() {}

/// Block or unblock a user
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/status",
    tag = "admin",
    request_body = UpdateUserStatusRequest,
    security(("session_cookie" = [], "admin_session" = [])),
    params(("id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "User updated", body = UserProfile),
        (status = 404, description = "User not found")
    )
)]
async fn set_user_status() {}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/number-permission",
    tag = "admin",
    request_body = NumberPermissionRequest,
    security(("session_cookie" = [], "admin_session" = [])),
    params(("id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "User updated", body = UserProfile),
        (status = 404, description = "User not found")
    )
)]
async fn set_number_permission() {}

/// Replace the shared number list
#[utoipa::path(
    put,
    path = "/api/admin/numbers",
    tag = "admin",
    request_body = NumbersRequest,
    security(("session_cookie" = [], "admin_session" = [])),
    responses((status = 200, description = "New number list", body = NumberListResponse))
)]
async fn replace_numbers() {}

/// OpenAPI documentation for the SMS Inspector API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SMS Inspector API",
        version = "1.0.0",
        description = "Dashboard API for browsing SMS delivery records fetched from the Premiumy provider.\n\n## Authentication\n\nSign in with `/api/auth/login`; the session is carried in the `token` cookie (API clients may send it as a Bearer token instead). Admin routes additionally need the `admin_session` cookie issued by `/api/admin/login`.",
        license(name = "MIT"),
    ),
    paths(
        health,
        site_settings,
        signup_status,
        signup,
        login,
        logout,
        me,
        update_profile,
        search_sms,
        analyze_message,
        summarize_message,
        list_numbers,
        add_numbers,
        admin_login,
        admin_logout,
        get_settings,
        update_settings,
        list_users,
        set_user_status,
        set_number_permission,
        replace_numbers,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            UpdateProfileRequest,
            SignupStatusResponse,
            SuccessResponse,
            SmsSearchRequest,
            SmsSearchResponse,
            MessageRequest,
            AnalyzeResponse,
            SummaryResponse,
            NumberListInput,
            NumbersRequest,
            NumberListResponse,
            AdminLoginRequest,
            UpdateSettingsRequest,
            UpdateSettingsResponse,
            UpdateUserStatusRequest,
            NumberPermissionRequest,
            UserListResponse,
            SmsRecord,
            PhoneGroup,
            ExtractedInfo,
            Segment,
            SiteSettings,
            AdminSettings,
            ProxySettings,
            ErrorMapping,
            UserProfile,
            UserStatus,
            UserId,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "site", description = "Public branding"),
        (name = "auth", description = "Sign-up and sessions"),
        (name = "profile", description = "The caller's own account"),
        (name = "sms", description = "SMS record search and message analysis"),
        (name = "numbers", description = "Shared phone number list"),
        (name = "admin", description = "Admin panel"),
    )
)]
pub struct ApiDoc;

/// Cookie and Bearer security schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("token"))),
            );
            components.add_security_scheme(
                "admin_session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("admin_session"))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
