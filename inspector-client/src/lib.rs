//! # Inspector Client SDK
//!
//! A typed Rust client for the SMS inspector API.
//!
//! The server keeps sessions in cookies. The client lifts the `token` cookie
//! out of the login response and sends it back as a Bearer token; the admin
//! panel cookie is replayed as a `Cookie` header.

use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use inspector_types::{
    AdminLoginRequest, AdminSettings, AnalyzeResponse, LoginRequest, MessageRequest,
    NumberListInput, NumberListResponse, NumberPermissionRequest, NumbersRequest, SignupRequest,
    SignupStatusResponse, SiteSettings, SmsSearchRequest, SmsSearchResponse, SuccessResponse,
    SummaryResponse, UpdateProfileRequest, UpdateSettingsRequest, UpdateSettingsResponse,
    UpdateUserStatusRequest, UserId, UserListResponse, UserProfile, UserStatus,
};

const TOKEN_COOKIE: &str = "token";
const ADMIN_COOKIE: &str = "admin_session";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response did not set the {0} cookie")]
    MissingCookie(&'static str),
}

/// SMS inspector API client.
pub struct InspectorClient {
    base_url: String,
    token: Option<String>,
    admin_session: Option<String>,
    http: Client,
}

impl InspectorClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            admin_session: None,
            http: Client::new(),
        }
    }

    /// Uses an existing session token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The current session token, if signed in.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Public
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn site_settings(&self) -> Result<SiteSettings, ClientError> {
        self.get("/api/site").await
    }

    pub async fn signup_status(&self) -> Result<SignupStatusResponse, ClientError> {
        self.get("/api/auth/signup-status").await
    }

    /// Creates an account. Does not sign in.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        let req = SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(Method::POST, "/api/auth/signup", Some(&req)).await
    }

    /// Signs in and keeps the session token for later calls.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .request(Method::POST, "/api/auth/login")
            .json(&req)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let token =
            set_cookie(&resp, TOKEN_COOKIE).ok_or(ClientError::MissingCookie(TOKEN_COOKIE))?;
        let profile = parse_body(resp).await?;
        self.token = Some(token);
        Ok(profile)
    }

    /// Ends both sessions on the server and forgets them locally.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let _: SuccessResponse = self
            .send(Method::POST, "/api/auth/logout", None::<&()>)
            .await?;
        self.token = None;
        self.admin_session = None;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Signed-in user
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        self.get("/api/auth/me").await
    }

    pub async fn update_profile(
        &self,
        name: &str,
        email: &str,
    ) -> Result<UserProfile, ClientError> {
        let req = UpdateProfileRequest {
            name: name.to_string(),
            email: email.to_string(),
        };
        self.send(Method::PUT, "/api/profile", Some(&req)).await
    }

    /// Fetches SMS records for a date range.
    pub async fn search_sms(
        &self,
        req: &SmsSearchRequest,
    ) -> Result<SmsSearchResponse, ClientError> {
        self.send(Method::POST, "/api/sms/search", Some(req)).await
    }

    pub async fn analyze_message(&self, message: &str) -> Result<AnalyzeResponse, ClientError> {
        let req = MessageRequest {
            message: message.to_string(),
        };
        self.send(Method::POST, "/api/sms/analyze", Some(&req)).await
    }

    pub async fn summarize_message(&self, message: &str) -> Result<SummaryResponse, ClientError> {
        let req = MessageRequest {
            message: message.to_string(),
        };
        self.send(Method::POST, "/api/sms/summarize", Some(&req)).await
    }

    pub async fn list_numbers(&self) -> Result<Vec<String>, ClientError> {
        let resp: NumberListResponse = self.get("/api/numbers").await?;
        Ok(resp.numbers)
    }

    /// Appends numbers to the shared list; returns the merged list.
    pub async fn add_numbers(&self, numbers: Vec<String>) -> Result<Vec<String>, ClientError> {
        let req = NumbersRequest {
            numbers: NumberListInput::List(numbers),
        };
        let resp: NumberListResponse = self.send(Method::POST, "/api/numbers", Some(&req)).await?;
        Ok(resp.numbers)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────────

    /// Unlocks the admin panel. Requires an admin user session.
    pub async fn admin_login(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        let req = AdminLoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .request(Method::POST, "/api/admin/login")
            .json(&req)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let session =
            set_cookie(&resp, ADMIN_COOKIE).ok_or(ClientError::MissingCookie(ADMIN_COOKIE))?;
        self.admin_session = Some(session);
        Ok(())
    }

    pub async fn admin_logout(&mut self) -> Result<(), ClientError> {
        let _: SuccessResponse = self
            .send(Method::POST, "/api/admin/logout", None::<&()>)
            .await?;
        self.admin_session = None;
        Ok(())
    }

    pub async fn get_settings(&self) -> Result<AdminSettings, ClientError> {
        self.get("/api/admin/settings").await
    }

    pub async fn update_settings(
        &self,
        req: &UpdateSettingsRequest,
    ) -> Result<UpdateSettingsResponse, ClientError> {
        self.send(Method::PUT, "/api/admin/settings", Some(req)).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ClientError> {
        let resp: UserListResponse = self.get("/api/admin/users").await?;
        Ok(resp.users)
    }

    pub async fn set_user_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<UserProfile, ClientError> {
        let req = UpdateUserStatusRequest { status };
        self.send(
            Method::PUT,
            &format!("/api/admin/users/{}/status", id),
            Some(&req),
        )
        .await
    }

    pub async fn set_number_permission(
        &self,
        id: UserId,
        can_add_numbers: bool,
    ) -> Result<UserProfile, ClientError> {
        let req = NumberPermissionRequest { can_add_numbers };
        self.send(
            Method::PUT,
            &format!("/api/admin/users/{}/number-permission", id),
            Some(&req),
        )
        .await
    }

    /// Replaces the shared number list.
    pub async fn replace_numbers(&self, numbers: Vec<String>) -> Result<Vec<String>, ClientError> {
        let req = NumbersRequest {
            numbers: NumberListInput::List(numbers),
        };
        let resp: NumberListResponse = self
            .send(Method::PUT, "/api/admin/numbers", Some(&req))
            .await?;
        Ok(resp.numbers)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(session) = &self.admin_session {
            req = req.header(COOKIE, format!("{}={}", ADMIN_COOKIE, session));
        }
        req
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(Method::GET, path, None::<&()>).await
    }

    async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let mut req = self.request(method, path);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = check_status(req.send().await?).await?;
        parse_body(resp).await
    }
}

/// Turns a non-2xx response into [`ClientError::Api`] with the server's `error` text.
async fn check_status(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or(body);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn parse_body<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Value of the named cookie in the response's `Set-Cookie` headers.
fn set_cookie(resp: &Response, name: &str) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(|h| {
            let pair = h.split(';').next()?;
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = InspectorClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
        assert!(client.token().is_none());
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = InspectorClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_token() {
        let client = InspectorClient::new("http://localhost:3000").with_token("jwt");
        assert_eq!(client.token(), Some("jwt"));
    }
}
