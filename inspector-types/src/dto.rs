//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{
    AdminSettings, ErrorMapping, ExtractedInfo, PhoneGroup, ProxySettings, Segment, SmsRecord,
    UserProfile, UserStatus, normalize_numbers, parse_number_text,
};

pub const DEFAULT_PER_PAGE: u32 = 100;
pub const MAX_PER_PAGE: u32 = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Auth DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a dashboard account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    #[schema(example = "Alice")]
    pub name: String,
    #[validate(email(message = "Please enter a valid email."))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,
}

/// Request to start a user session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email."))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// Request to change the caller's own name and email.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email."))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupStatusResponse {
    pub signup_enabled: bool,
}

/// Generic acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SMS DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Filter form for the SMS search.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SmsSearchRequest {
    #[schema(value_type = String, format = Date, example = "2024-05-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-05-01")]
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Telegram")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Page number, starting at 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size (1-1000, default 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

/// Records of one search, flat and grouped by phone number.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SmsSearchResponse {
    pub total: usize,
    pub records: Vec<SmsRecord>,
    pub groups: Vec<PhoneGroup>,
}

/// A message body to analyze or summarize.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageRequest {
    #[schema(example = "Telegram code: 48213. Do not give this code to anyone")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub info: ExtractedInfo,
    /// The message split into plain, link and code segments
    pub segments: Vec<Segment>,
    /// Which analyzer produced the result
    pub analyzer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub summary: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Number list DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Numbers given either as a list or as free text (one per line or comma separated).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum NumberListInput {
    List(Vec<String>),
    Text(String),
}

impl NumberListInput {
    /// Normalized numbers: trimmed, no blanks, no duplicates.
    pub fn into_numbers(self) -> Vec<String> {
        match self {
            NumberListInput::List(list) => normalize_numbers(list),
            NumberListInput::Text(text) => parse_number_text(&text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NumbersRequest {
    pub numbers: NumberListInput,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NumberListResponse {
    pub numbers: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials for the admin panel (second gate after an admin user session).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    pub password: String,
}

/// Partial settings update. Absent fields are left unchanged.
///
/// Sending `proxySettings` with an empty `ip` switches the proxy off.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_settings: Option<ProxySettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signup_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_change_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_list: Option<NumberListInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_mappings: Option<Vec<ErrorMapping>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsResponse {
    pub settings: AdminSettings,
    /// What the proxy probe answered, when a proxy was tested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_check: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NumberPermissionRequest {
    pub can_add_numbers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserProfile>,
}

/// First validation message of a failed `validator` check, for display.
pub fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input.".to_string())
}
