use std::time::Duration;

use serde::Serialize;

use inspector_types::{
    GatewayAccess, MdrQuery, ProviderError, ProxySettings, SmsGateway, SmsRecord,
};

use crate::normalize::parse_response;

pub const DEFAULT_API_URL: &str = "https://api.premiumy.net/v1.0/csv";
pub const DEFAULT_PROBE_URL: &str = "https://api.ipify.org?format=json";
pub const MDR_METHOD: &str = "sms.mdr_full:get_list";

/// Endpoint and timeout settings for [`PremiumyClient`].
#[derive(Debug, Clone)]
pub struct PremiumyConfig {
    pub api_url: String,
    /// Endpoint hit through a proxy to check that it works
    pub probe_url: String,
    pub timeout: Duration,
}

impl Default for PremiumyConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            probe_url: DEFAULT_PROBE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    id: Option<u64>,
    jsonrpc: &'static str,
    method: &'static str,
    params: RpcParams<'a>,
}

#[derive(Debug, Serialize)]
struct RpcParams<'a> {
    filter: MdrFilter<'a>,
    page: u32,
    per_page: u32,
}

#[derive(Debug, Serialize)]
struct MdrFilter<'a> {
    start_date: String,
    end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    senderid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl<'a> RpcRequest<'a> {
    fn mdr_list(query: &'a MdrQuery) -> Self {
        Self {
            id: None,
            jsonrpc: "2.0",
            method: MDR_METHOD,
            params: RpcParams {
                filter: MdrFilter {
                    start_date: query.start_bound(),
                    end_date: query.end_bound(),
                    senderid: non_blank(&query.sender_id),
                    phone: non_blank(&query.phone),
                },
                page: query.page,
                per_page: query.per_page,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for the Premiumy API.
///
/// The direct client is built once. A proxied client is built per call because
/// the proxy can change at any time through the admin settings.
#[derive(Debug, Clone)]
pub struct PremiumyClient {
    config: PremiumyConfig,
    http: reqwest::Client,
}

impl PremiumyClient {
    pub fn new(config: PremiumyConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &PremiumyConfig {
        &self.config
    }

    fn proxied(&self, proxy: &ProxySettings) -> Result<reqwest::Client, ProviderError> {
        let mut upstream = reqwest::Proxy::all(proxy.proxy_url())
            .map_err(|e| ProviderError::Proxy(e.to_string()))?;
        if proxy.has_credentials() {
            upstream = upstream.basic_auth(proxy.username.trim(), &proxy.password);
        }
        reqwest::Client::builder()
            .timeout(self.config.timeout)
            .proxy(upstream)
            .build()
            .map_err(|e| ProviderError::Proxy(e.to_string()))
    }

    fn client_for(&self, proxy: Option<&ProxySettings>) -> Result<reqwest::Client, ProviderError> {
        match proxy.filter(|p| !p.is_disabled()) {
            Some(proxy) => {
                tracing::debug!(proxy = %proxy.proxy_url(), "Routing request through proxy");
                self.proxied(proxy)
            }
            None => Ok(self.http.clone()),
        }
    }
}

#[async_trait::async_trait]
impl SmsGateway for PremiumyClient {
    #[tracing::instrument(skip(self, access), fields(page = query.page, per_page = query.per_page))]
    async fn fetch_records(
        &self,
        query: &MdrQuery,
        access: &GatewayAccess,
    ) -> Result<Vec<SmsRecord>, ProviderError> {
        let client = self.client_for(access.proxy.as_ref())?;

        let response = client
            .post(&self.config.api_url)
            .header("Api-Key", access.api_key.trim())
            .json(&RpcRequest::mdr_list(query))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Billing API returned an error status");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body: body.trim().to_string(),
            });
        }

        let records = parse_response(&body)?;
        tracing::info!(count = records.len(), "Fetched message detail records");
        Ok(records)
    }

    #[tracing::instrument(skip(self, proxy), fields(proxy = %proxy.proxy_url()))]
    async fn check_proxy(&self, proxy: &ProxySettings) -> Result<String, ProviderError> {
        let client = self.proxied(proxy)?;

        let response = client
            .get(&self.config.probe_url)
            .send()
            .await
            .map_err(|e| ProviderError::Proxy(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Proxy(format!(
                "probe answered {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Proxy(e.to_string()))?;
        Ok(body.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn query() -> MdrQuery {
        MdrQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            sender_id: Some(" Telegram ".into()),
            phone: Some("".into()),
            page: 2,
            per_page: 50,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let q = query();
        let body = serde_json::to_value(RpcRequest::mdr_list(&q)).unwrap();

        assert_eq!(body["jsonrpc"], "2.0");
        assert!(body["id"].is_null());
        assert_eq!(body["method"], "sms.mdr_full:get_list");
        assert_eq!(body["params"]["page"], 2);
        assert_eq!(body["params"]["per_page"], 50);

        let filter = &body["params"]["filter"];
        assert_eq!(filter["start_date"], "2024-05-01 00:00:00");
        assert_eq!(filter["end_date"], "2024-05-02 23:59:59");
        assert_eq!(filter["senderid"], "Telegram");
        assert!(filter.get("phone").is_none());
    }

    #[test]
    fn test_disabled_proxy_uses_direct_client() {
        let client = PremiumyClient::new(PremiumyConfig::default()).unwrap();
        let off = ProxySettings::default();
        assert!(client.client_for(Some(&off)).is_ok());
        assert!(client.client_for(None).is_ok());
    }
}
