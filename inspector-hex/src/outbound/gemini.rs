//! Gemini `generateContent` analyzer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use inspector_types::{AnalyzerError, ExtractedInfo, MessageAnalyzer};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

const EXTRACT_PROMPT: &str = "Analyze the following SMS message and extract the confirmation code \
(e.g., from Telegram, WhatsApp) and any link.";
const SUMMARY_PROMPT: &str = "Summarize the following SMS message in a concise manner:";

/// Message analyzer backed by the Gemini API.
#[derive(Clone)]
pub struct GeminiAnalyzer {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAnalyzer")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary: String,
}

impl GeminiAnalyzer {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Sends one prompt in JSON mode and returns the text of the first candidate.
    async fn generate(
        &self,
        prompt: String,
        schema: serde_json::Value,
    ) -> Result<String, AnalyzerError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }),
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalyzerError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Request(format!(
                "Gemini returned {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .find(|t| !t.trim().is_empty())
            .ok_or_else(|| AnalyzerError::InvalidResponse("empty model response".into()))
    }
}

#[async_trait::async_trait]
impl MessageAnalyzer for GeminiAnalyzer {
    fn name(&self) -> &'static str {
        "gemini"
    }

    #[tracing::instrument(skip(self, message), fields(model = %self.model))]
    async fn extract(&self, message: &str) -> Result<ExtractedInfo, AnalyzerError> {
        let prompt = format!("{}\n\nMessage: \"{}\"", EXTRACT_PROMPT, message);
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "confirmationCode": {"type": "STRING", "description": "The confirmation code found in the message, if any."},
                "link": {"type": "STRING", "description": "The link found in the message, if any."},
                "other": {"type": "STRING", "description": "Other important information found in the message."}
            }
        });

        let text = self.generate(prompt, schema).await?;
        let info: ExtractedInfo = serde_json::from_str(text.trim())
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;
        Ok(info.normalized())
    }

    #[tracing::instrument(skip(self, message), fields(model = %self.model))]
    async fn summarize(&self, message: &str) -> Result<String, AnalyzerError> {
        let prompt = format!("{}\n\n{}", SUMMARY_PROMPT, message);
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "summary": {"type": "STRING", "description": "A concise summary of the SMS message content."}
            },
            "required": ["summary"]
        });

        let text = self.generate(prompt, schema).await?;
        let output: SummaryOutput = serde_json::from_str(text.trim())
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;
        Ok(output.summary.trim().to_string())
    }
}
