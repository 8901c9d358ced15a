//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Response},
};

use inspector_types::{
    AdminLoginRequest, AppError, DashboardRepository, LoginRequest, MessageRequest,
    NumberListResponse, NumberPermissionRequest, NumbersRequest, SignupRequest, SmsSearchRequest,
    SuccessResponse, UpdateProfileRequest, UpdateSettingsRequest, UpdateUserStatusRequest, User,
    UserId, UserListResponse,
};

use super::session::SessionManager;
use crate::InspectorService;

/// Application state shared across handlers.
pub struct AppState<R: DashboardRepository> {
    pub service: InspectorService<R>,
    pub sessions: SessionManager,
}

/// The signed-in user, attached to the request by the session middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        error_response(status, &message)
    }
}

/// `{"error": .., "code": ..}` body used for every failure.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({
        "error": message,
        "code": status.as_u16()
    });
    (status, Json(body)).into_response()
}

fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    id.parse()
        .map_err(|_| ApiError(AppError::BadRequest("Invalid user ID".into())))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Public
// ─────────────────────────────────────────────────────────────────────────────

/// Branding and feature flags for the login and sign-up pages.
#[tracing::instrument(skip(state))]
pub async fn site_settings<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.site_settings().await?))
}

#[tracing::instrument(skip(state))]
pub async fn signup_status<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.signup_status().await?))
}

#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn signup<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.signup(req).await?;
    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// Checks credentials and sets the `token` cookie.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn login<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.login(req).await?;
    let token = state.sessions.issue_token(&user)?;
    Ok((
        [(SET_COOKIE, state.sessions.user_cookie(&token))],
        Json(user.profile()),
    ))
}

/// Clears both session cookies.
pub async fn logout<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> impl IntoResponse {
    (
        AppendHeaders([
            (SET_COOKIE, state.sessions.clear_user_cookie()),
            (SET_COOKIE, state.sessions.clear_admin_cookie()),
        ]),
        Json(SuccessResponse::ok()),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Signed-in user
// ─────────────────────────────────────────────────────────────────────────────

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(user.profile())
}

#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn update_profile<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.service.update_profile(user.id, req).await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state, req), fields(start = %req.start_date, end = %req.end_date))]
pub async fn search_sms<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<SmsSearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.service.fetch_sms(req).await?;
    Ok(Json(result))
}

#[tracing::instrument(skip(state, req))]
pub async fn analyze_message<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.analyze_message(&req.message).await?))
}

#[tracing::instrument(skip(state, req))]
pub async fn summarize_message<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.summarize_message(&req.message).await?))
}

pub async fn list_numbers<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let numbers = state.service.number_list().await?;
    Ok(Json(NumberListResponse { numbers }))
}

#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn add_numbers<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<NumbersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let numbers = state.service.add_numbers(&user, req.numbers).await?;
    Ok(Json(NumberListResponse { numbers }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────────────────────────

/// Unlocks the admin panel by setting the `admin_session` cookie.
#[tracing::instrument(skip(state, req))]
pub async fn admin_login<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.admin_login(&req)?;
    let value = state.sessions.issue_admin_session();
    Ok((
        [(SET_COOKIE, state.sessions.admin_cookie(&value))],
        Json(SuccessResponse::ok()),
    ))
}

pub async fn admin_logout<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> impl IntoResponse {
    (
        [(SET_COOKIE, state.sessions.clear_admin_cookie())],
        Json(SuccessResponse::ok()),
    )
}

#[tracing::instrument(skip(state))]
pub async fn get_settings<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.admin_settings().await?))
}

#[tracing::instrument(skip(state, req))]
pub async fn update_settings<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.update_settings(req).await?))
}

#[tracing::instrument(skip(state))]
pub async fn list_users<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.service.list_users().await?;
    Ok(Json(UserListResponse { users }))
}

#[tracing::instrument(skip(state, req), fields(user_id = %id))]
pub async fn set_user_status<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_user_id(&id)?;
    Ok(Json(state.service.set_user_status(id, req.status).await?))
}

#[tracing::instrument(skip(state, req), fields(user_id = %id))]
pub async fn set_number_permission<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<NumberPermissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_user_id(&id)?;
    let profile = state
        .service
        .set_add_number_permission(id, req.can_add_numbers)
        .await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state, req))]
pub async fn replace_numbers<R: DashboardRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<NumbersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let numbers = state.service.replace_number_list(req.numbers).await?;
    Ok(Json(NumberListResponse { numbers }))
}
