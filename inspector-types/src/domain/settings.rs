//! Persisted dashboard settings.
//!
//! Settings are stored as a key/value table where every value is JSON. The
//! typed view ([`AdminSettings`]) is rebuilt from whatever rows exist, falling
//! back to defaults for keys that are missing or hold the wrong shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::DomainError;

pub const DEFAULT_SITE_NAME: &str = "SMS Inspector";

/// Keys of the settings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    ApiKey,
    ProxySettings,
    SignupEnabled,
    SiteName,
    PrimaryColor,
    EmailChangeEnabled,
    NumberList,
    ErrorMappings,
}

impl SettingKey {
    pub const ALL: [SettingKey; 8] = [
        SettingKey::ApiKey,
        SettingKey::ProxySettings,
        SettingKey::SignupEnabled,
        SettingKey::SiteName,
        SettingKey::PrimaryColor,
        SettingKey::EmailChangeEnabled,
        SettingKey::NumberList,
        SettingKey::ErrorMappings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ApiKey => "apiKey",
            SettingKey::ProxySettings => "proxySettings",
            SettingKey::SignupEnabled => "signupEnabled",
            SettingKey::SiteName => "siteName",
            SettingKey::PrimaryColor => "primaryColor",
            SettingKey::EmailChangeEnabled => "emailChangeEnabled",
            SettingKey::NumberList => "numberList",
            SettingKey::ErrorMappings => "errorMappings",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound HTTP proxy used for billing API calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    #[schema(example = "203.0.113.7")]
    pub ip: String,
    #[serde(default, deserialize_with = "deserialize_port")]
    #[schema(value_type = u16, example = 8080)]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl ProxySettings {
    /// An empty host switches the proxy off.
    pub fn is_disabled(&self) -> bool {
        self.ip.trim().is_empty()
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.trim().is_empty()
    }

    /// Checks that an enabled proxy has a usable host and port.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_disabled() {
            return Ok(());
        }
        let host = self.ip.trim();
        if host.contains(char::is_whitespace) || host.contains('/') {
            return Err(DomainError::ValidationError(format!(
                "Invalid proxy host: {}",
                host
            )));
        }
        if self.port == 0 {
            return Err(DomainError::ValidationError(
                "Proxy port must be between 1 and 65535".into(),
            ));
        }
        Ok(())
    }

    /// Proxy URL without credentials, e.g. `http://203.0.113.7:8080`.
    pub fn proxy_url(&self) -> String {
        format!("http://{}:{}", self.ip.trim(), self.port)
    }
}

/// Accepts the port either as a JSON number or as a numeric string.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(n) => Ok(n),
        Port::Text(s) if s.trim().is_empty() => Ok(0),
        Port::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Rewrites an upstream error message into something friendlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorMapping {
    /// Case-insensitive substring searched in the upstream error text
    #[schema(example = "401")]
    pub pattern: String,
    /// Message shown instead
    #[schema(example = "The billing API key was rejected.")]
    pub message: String,
}

/// Returns the message of the first mapping whose pattern occurs in `error`.
pub fn apply_error_mappings(mappings: &[ErrorMapping], error: &str) -> Option<String> {
    let haystack = error.to_lowercase();
    mappings
        .iter()
        .filter(|m| !m.pattern.trim().is_empty())
        .find(|m| haystack.contains(&m.pattern.trim().to_lowercase()))
        .map(|m| m.message.clone())
}

/// Branding and feature flags visible without logging in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_name: String,
    pub primary_color: String,
    pub signup_enabled: bool,
    pub email_change_enabled: bool,
}

/// Every setting, as edited from the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    pub api_key: String,
    pub proxy_settings: Option<ProxySettings>,
    pub signup_enabled: bool,
    pub site_name: String,
    pub primary_color: String,
    pub email_change_enabled: bool,
    pub number_list: Vec<String>,
    pub error_mappings: Vec<ErrorMapping>,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            proxy_settings: None,
            signup_enabled: true,
            site_name: DEFAULT_SITE_NAME.to_string(),
            primary_color: String::new(),
            email_change_enabled: true,
            number_list: Vec::new(),
            error_mappings: Vec::new(),
        }
    }
}

impl AdminSettings {
    /// Rebuilds the typed settings from stored key/value rows.
    ///
    /// Unknown keys are ignored; values with an unexpected shape keep the default.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut settings = Self::default();
        for (key, value) in entries {
            let Some(key) = SettingKey::parse(&key) else {
                continue;
            };
            match key {
                SettingKey::ApiKey => {
                    if let Some(s) = value.as_str() {
                        settings.api_key = s.to_string();
                    }
                }
                SettingKey::ProxySettings => {
                    settings.proxy_settings = serde_json::from_value::<ProxySettings>(value)
                        .ok()
                        .filter(|p| !p.is_disabled());
                }
                SettingKey::SignupEnabled => {
                    if let Some(b) = value.as_bool() {
                        settings.signup_enabled = b;
                    }
                }
                SettingKey::SiteName => {
                    if let Some(s) = value.as_str().filter(|s| !s.trim().is_empty()) {
                        settings.site_name = s.to_string();
                    }
                }
                SettingKey::PrimaryColor => {
                    if let Some(s) = value.as_str() {
                        settings.primary_color = s.to_string();
                    }
                }
                SettingKey::EmailChangeEnabled => {
                    if let Some(b) = value.as_bool() {
                        settings.email_change_enabled = b;
                    }
                }
                SettingKey::NumberList => {
                    if let Ok(list) = serde_json::from_value::<Vec<String>>(value) {
                        settings.number_list = list;
                    }
                }
                SettingKey::ErrorMappings => {
                    if let Ok(list) = serde_json::from_value::<Vec<ErrorMapping>>(value) {
                        settings.error_mappings = list;
                    }
                }
            }
        }
        settings
    }

    pub fn site(&self) -> SiteSettings {
        SiteSettings {
            site_name: self.site_name.clone(),
            primary_color: self.primary_color.clone(),
            signup_enabled: self.signup_enabled,
            email_change_enabled: self.email_change_enabled,
        }
    }
}

/// Accepts HSL triples in the form `217.2 91.2% 59.8%`.
pub fn is_hsl_triple(value: &str) -> bool {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let (hue, saturation, lightness) = match parts.as_slice() {
        [h, s, l] => (*h, *s, *l),
        _ => return false,
    };

    let percent = |s: &str| {
        s.strip_suffix('%')
            .and_then(|n| n.parse::<f64>().ok())
            .is_some_and(|n| (0.0..=100.0).contains(&n))
    };

    hue.parse::<f64>()
        .is_ok_and(|h| (0.0..=360.0).contains(&h))
        && percent(saturation)
        && percent(lightness)
}
