//! SMS gateway port.
//!
//! Implemented by the billing API client. The API key and proxy come from the
//! settings table, so they are passed per call instead of at construction.

use chrono::NaiveDate;

use crate::domain::{ProxySettings, SmsRecord};

/// Error type for billing API operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0}")]
    Transport(String),

    #[error("API Error: {status} {reason}. {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("API returned an error: {0}")]
    Api(String),

    #[error("CSV response is missing required columns ('datetime', 'message').")]
    MissingColumns,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Proxy(String),
}

/// Filter for one page of message detail records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdrQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sender_id: Option<String>,
    pub phone: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl MdrQuery {
    /// Lower bound sent upstream: the start of `start_date`.
    pub fn start_bound(&self) -> String {
        self.start_date.format("%Y-%m-%d 00:00:00").to_string()
    }

    /// Upper bound sent upstream: the end of `end_date`.
    pub fn end_bound(&self) -> String {
        self.end_date.format("%Y-%m-%d 23:59:59").to_string()
    }
}

/// Credentials and routing for one gateway call.
#[derive(Debug, Clone)]
pub struct GatewayAccess {
    pub api_key: String,
    pub proxy: Option<ProxySettings>,
}

/// Port trait for SMS record providers.
#[async_trait::async_trait]
pub trait SmsGateway: Send + Sync {
    /// Fetches and normalizes one page of records.
    async fn fetch_records(
        &self,
        query: &MdrQuery,
        access: &GatewayAccess,
    ) -> Result<Vec<SmsRecord>, ProviderError>;

    /// Sends a probe request through `proxy`; returns what the probe endpoint answered.
    async fn check_proxy(&self, proxy: &ProxySettings) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_cover_whole_days() {
        let query = MdrQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            sender_id: None,
            phone: None,
            page: 1,
            per_page: 100,
        };
        assert_eq!(query.start_bound(), "2024-05-01 00:00:00");
        assert_eq!(query.end_bound(), "2024-05-03 23:59:59");
    }

    #[test]
    fn test_status_error_message() {
        let err = ProviderError::Status {
            status: 403,
            reason: "Forbidden".into(),
            body: "denied".into(),
        };
        assert_eq!(err.to_string(), "API Error: 403 Forbidden. denied");
    }
}
