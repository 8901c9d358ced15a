//! Inspector Application Service
//!
//! Orchestrates the dashboard operations through the repository, gateway and
//! analyzer ports. Contains NO HTTP logic.

use std::sync::Arc;

use serde_json::Value;
use validator::Validate;

use inspector_repo::security;
use inspector_types::domain::settings::{apply_error_mappings, is_hsl_triple};
use inspector_types::domain::{group_by_phone, highlight, merge_numbers};
use inspector_types::{
    AdminLoginRequest, AdminSettings, AnalyzeResponse, AppError, DEFAULT_PER_PAGE,
    DashboardRepository, GatewayAccess, LoginRequest, MAX_PER_PAGE, MdrQuery, MessageAnalyzer,
    NumberListInput, SettingKey, SignupRequest, SignupStatusResponse, SiteSettings, SmsGateway,
    SmsSearchRequest, SmsSearchResponse, SummaryResponse, UpdateProfileRequest,
    UpdateSettingsRequest, UpdateSettingsResponse, User, UserId, UserProfile, UserStatus,
    first_validation_message,
};

pub const API_KEY_MISSING: &str = "API key is not configured. Please set it in the admin panel.";
pub const INVALID_FILTER: &str = "Invalid filter data.";
pub const INVALID_LOGIN: &str = "Invalid email or password.";
pub const INVALID_ADMIN_LOGIN: &str = "Invalid admin credentials.";
pub const DUPLICATE_EMAIL: &str = "User with this email already exists.";

/// Credentials of the admin panel's second gate.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Application service for the dashboard.
///
/// Generic over `R: DashboardRepository`; the gateway and analyzer are trait
/// objects because they are picked from runtime configuration.
pub struct InspectorService<R: DashboardRepository> {
    repo: R,
    gateway: Arc<dyn SmsGateway>,
    analyzer: Arc<dyn MessageAnalyzer>,
    admin: AdminCredentials,
}

fn validate<T: Validate>(req: &T) -> Result<(), AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(first_validation_message(&e)))
}

fn internal(err: impl std::fmt::Display) -> AppError {
    AppError::Internal(err.to_string())
}

impl<R: DashboardRepository> InspectorService<R> {
    pub fn new(
        repo: R,
        gateway: Arc<dyn SmsGateway>,
        analyzer: Arc<dyn MessageAnalyzer>,
        admin: AdminCredentials,
    ) -> Self {
        Self {
            repo,
            gateway,
            analyzer,
            admin,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn analyzer_name(&self) -> &'static str {
        self.analyzer.name()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────────────

    /// Every setting, defaults filled in.
    pub async fn admin_settings(&self) -> Result<AdminSettings, AppError> {
        let entries = self.repo.list_settings().await?;
        Ok(AdminSettings::from_entries(entries))
    }

    pub async fn site_settings(&self) -> Result<SiteSettings, AppError> {
        Ok(self.admin_settings().await?.site())
    }

    pub async fn signup_status(&self) -> Result<SignupStatusResponse, AppError> {
        let settings = self.admin_settings().await?;
        Ok(SignupStatusResponse {
            signup_enabled: settings.signup_enabled,
        })
    }

    /// Applies a partial settings update.
    ///
    /// A new proxy is validated and probed before anything is written; if the
    /// probe fails the whole update is rejected.
    #[tracing::instrument(skip_all)]
    pub async fn update_settings(
        &self,
        req: UpdateSettingsRequest,
    ) -> Result<UpdateSettingsResponse, AppError> {
        let mut entries: Vec<(String, Value)> = Vec::new();
        let mut proxy_check = None;

        let put = |entries: &mut Vec<(String, Value)>, key: SettingKey, value: Value| {
            entries.push((key.as_str().to_string(), value));
        };

        if let Some(proxy) = req.proxy_settings {
            proxy.validate()?;
            if !proxy.is_disabled() {
                let answer = self.gateway.check_proxy(&proxy).await.map_err(|e| {
                    tracing::warn!("Proxy probe failed: {}", e);
                    AppError::BadRequest(format!("Proxy test failed: {}", e))
                })?;
                tracing::info!(proxy = %proxy.proxy_url(), "Proxy probe succeeded");
                proxy_check = Some(answer);
            }
            put(
                &mut entries,
                SettingKey::ProxySettings,
                serde_json::to_value(&proxy).map_err(internal)?,
            );
        }

        if let Some(color) = req.primary_color {
            let color = color.trim().to_string();
            if !color.is_empty() && !is_hsl_triple(&color) {
                return Err(AppError::BadRequest(
                    "Primary color must be an HSL triple such as \"217.2 91.2% 59.8%\".".into(),
                ));
            }
            put(&mut entries, SettingKey::PrimaryColor, Value::String(color));
        }

        if let Some(api_key) = req.api_key {
            put(&mut entries, SettingKey::ApiKey, Value::String(api_key.trim().to_string()));
        }
        if let Some(enabled) = req.signup_enabled {
            put(&mut entries, SettingKey::SignupEnabled, Value::Bool(enabled));
        }
        if let Some(name) = req.site_name {
            put(&mut entries, SettingKey::SiteName, Value::String(name.trim().to_string()));
        }
        if let Some(enabled) = req.email_change_enabled {
            put(&mut entries, SettingKey::EmailChangeEnabled, Value::Bool(enabled));
        }
        if let Some(numbers) = req.number_list {
            put(&mut entries, SettingKey::NumberList, Value::from(numbers.into_numbers()));
        }
        if let Some(mappings) = req.error_mappings {
            let mappings: Vec<_> = mappings
                .into_iter()
                .filter(|m| !m.pattern.trim().is_empty())
                .collect();
            put(
                &mut entries,
                SettingKey::ErrorMappings,
                serde_json::to_value(mappings).map_err(internal)?,
            );
        }

        if !entries.is_empty() {
            let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
            tracing::info!(?keys, "Updating settings");
            self.repo.put_settings(entries).await?;
        }

        Ok(UpdateSettingsResponse {
            settings: self.admin_settings().await?,
            proxy_check,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // SMS
    // ─────────────────────────────────────────────────────────────────────────────

    /// Fetches one page of records and groups them by phone number.
    #[tracing::instrument(skip(self), fields(start = %req.start_date, end = %req.end_date))]
    pub async fn fetch_sms(&self, req: SmsSearchRequest) -> Result<SmsSearchResponse, AppError> {
        let settings = self.admin_settings().await?;
        let api_key = settings.api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::Unavailable(API_KEY_MISSING.into()));
        }

        let page = req.page.unwrap_or(1);
        let per_page = req.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if req.end_date < req.start_date || page == 0 || per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(AppError::BadRequest(INVALID_FILTER.into()));
        }

        let query = MdrQuery {
            start_date: req.start_date,
            end_date: req.end_date,
            sender_id: req.sender_id,
            phone: req.phone,
            page,
            per_page,
        };
        let access = GatewayAccess {
            api_key: api_key.to_string(),
            proxy: settings.proxy_settings.clone(),
        };

        let records = match self.gateway.fetch_records(&query, &access).await {
            Ok(records) => records,
            Err(e) => {
                let raw = e.to_string();
                tracing::error!("Failed to fetch SMS data: {}", raw);
                let message = apply_error_mappings(&settings.error_mappings, &raw).unwrap_or(raw);
                return Err(AppError::Upstream(message));
            }
        };

        let groups = group_by_phone(&records);
        Ok(SmsSearchResponse {
            total: records.len(),
            records,
            groups,
        })
    }

    pub async fn analyze_message(&self, message: &str) -> Result<AnalyzeResponse, AppError> {
        if message.trim().is_empty() {
            return Err(AppError::BadRequest("Message is empty.".into()));
        }

        let info = self.analyzer.extract(message).await.map_err(|e| {
            tracing::error!("Failed to analyze message: {}", e);
            AppError::from(e)
        })?;
        let info = info.normalized();

        Ok(AnalyzeResponse {
            segments: highlight(message, &info),
            info,
            analyzer: self.analyzer.name().to_string(),
        })
    }

    pub async fn summarize_message(&self, message: &str) -> Result<SummaryResponse, AppError> {
        if message.trim().is_empty() {
            return Err(AppError::BadRequest("Message is empty.".into()));
        }

        let summary = self.analyzer.summarize(message).await.map_err(|e| {
            tracing::error!("Failed to summarize message: {}", e);
            AppError::from(e)
        })?;
        Ok(SummaryResponse { summary })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(email = %req.email))]
    pub async fn signup(&self, req: SignupRequest) -> Result<User, AppError> {
        validate(&req)?;

        if !self.admin_settings().await?.signup_enabled {
            return Err(AppError::Forbidden("Sign-up is currently disabled.".into()));
        }

        let email = inspector_types::domain::user::normalize_email(&req.email);
        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(DUPLICATE_EMAIL.into()));
        }

        let hash = security::hash_password(&req.password).map_err(internal)?;
        let user = User::new(req.name.trim().to_string(), email, hash)?;
        let user = self.repo.create_user(user).await?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    #[tracing::instrument(skip_all, fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<User, AppError> {
        validate(&req)?;

        let email = inspector_types::domain::user::normalize_email(&req.email);
        let user = self
            .repo
            .find_user_by_email(&email)
            .await?
            .filter(|u| security::verify_password(&req.password, &u.password_hash))
            .ok_or_else(|| AppError::Unauthorized(INVALID_LOGIN.into()))?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    pub async fn current_user(&self, id: UserId) -> Result<User, AppError> {
        self.repo
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".into()))
    }

    #[tracing::instrument(skip(self, req), fields(user_id = %id))]
    pub async fn update_profile(
        &self,
        id: UserId,
        req: UpdateProfileRequest,
    ) -> Result<UserProfile, AppError> {
        validate(&req)?;
        let user = self.current_user(id).await?;

        let email = inspector_types::domain::user::normalize_email(&req.email);
        if email != user.email {
            if !self.admin_settings().await?.email_change_enabled {
                return Err(AppError::Forbidden(
                    "Changing the email address is disabled.".into(),
                ));
            }
            if let Some(other) = self.repo.find_user_by_email(&email).await? {
                if other.id != id {
                    return Err(AppError::Conflict(DUPLICATE_EMAIL.into()));
                }
            }
        }

        let updated = self
            .repo
            .update_user_profile(id, req.name.trim(), &email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".into()))?;
        Ok(updated.profile())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn admin_login(&self, req: &AdminLoginRequest) -> Result<(), AppError> {
        let user_ok = security::constant_time_eq(&req.username, &self.admin.username);
        let pass_ok = security::constant_time_eq(&req.password, &self.admin.password);
        if user_ok & pass_ok {
            tracing::info!("Admin panel unlocked");
            Ok(())
        } else {
            tracing::warn!("Rejected admin panel login");
            Err(AppError::Unauthorized(INVALID_ADMIN_LOGIN.into()))
        }
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, AppError> {
        let users = self.repo.list_users().await?;
        Ok(users.iter().map(User::profile).collect())
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    pub async fn set_user_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<UserProfile, AppError> {
        self.repo
            .update_user_status(id, status)
            .await?
            .map(|u| u.profile())
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    pub async fn set_add_number_permission(
        &self,
        id: UserId,
        can_add_numbers: bool,
    ) -> Result<UserProfile, AppError> {
        self.repo
            .update_user_number_permission(id, can_add_numbers)
            .await?
            .map(|u| u.profile())
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Number list
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn number_list(&self) -> Result<Vec<String>, AppError> {
        Ok(self.admin_settings().await?.number_list)
    }

    pub async fn replace_number_list(
        &self,
        input: NumberListInput,
    ) -> Result<Vec<String>, AppError> {
        let numbers = input.into_numbers();
        self.repo
            .put_settings(vec![(
                SettingKey::NumberList.as_str().to_string(),
                Value::from(numbers.clone()),
            )])
            .await?;
        Ok(numbers)
    }

    /// Appends numbers for a user allowed to do so. Existing entries keep their position.
    #[tracing::instrument(skip(self, user, input), fields(user_id = %user.id))]
    pub async fn add_numbers(
        &self,
        user: &User,
        input: NumberListInput,
    ) -> Result<Vec<String>, AppError> {
        if !user.may_add_numbers() {
            return Err(AppError::Forbidden(
                "You do not have permission to add numbers.".into(),
            ));
        }

        let current = self.number_list().await?;
        let merged = merge_numbers(&current, &input.into_numbers());
        self.repo
            .put_settings(vec![(
                SettingKey::NumberList.as_str().to_string(),
                Value::from(merged.clone()),
            )])
            .await?;
        Ok(merged)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates the admin user when no account uses `email`. Returns whether one was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool, AppError> {
        let email = inspector_types::domain::user::normalize_email(email);
        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Ok(false);
        }

        let hash = security::hash_password(password).map_err(internal)?;
        let admin = User::new("Admin".into(), email, hash)?.with_admin(true);
        self.repo.create_user(admin).await?;
        Ok(true)
    }

    /// Stores `api_key` unless an API key is already configured.
    pub async fn seed_api_key(&self, api_key: &str) -> Result<bool, AppError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Ok(false);
        }
        let existing = self.repo.get_setting(SettingKey::ApiKey.as_str()).await?;
        if existing
            .as_ref()
            .and_then(Value::as_str)
            .is_some_and(|k| !k.trim().is_empty())
        {
            return Ok(false);
        }

        self.repo
            .put_settings(vec![(
                SettingKey::ApiKey.as_str().to_string(),
                Value::String(api_key.to_string()),
            )])
            .await?;
        Ok(true)
    }
}
