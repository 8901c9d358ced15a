//! Offline analyzer: regular expressions instead of a model.

use std::sync::LazyLock;

use regex::Regex;

use inspector_types::{AnalyzerError, ExtractedInfo, MessageAnalyzer};

const SUMMARY_MAX_CHARS: usize = 160;

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).expect("link pattern is valid")
});

static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{3}-\d{3}|\d{4,8})\b").expect("code pattern is valid"));

/// Picks the first link and the first 4-8 digit (or `123-456`) code.
#[derive(Debug, Default, Clone)]
pub struct PatternAnalyzer;

impl PatternAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_sync(&self, message: &str) -> ExtractedInfo {
        let link = LINK
            .find(message)
            .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')']))
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        // Digits inside the link are not a code.
        let without_link = match &link {
            Some(l) => message.replace(l.as_str(), " "),
            None => message.to_string(),
        };
        let confirmation_code = CODE
            .find(&without_link)
            .map(|m| m.as_str().to_string());

        ExtractedInfo {
            confirmation_code,
            link,
            other: None,
        }
    }

    pub fn summarize_sync(&self, message: &str) -> String {
        let text = message.split_whitespace().collect::<Vec<_>>().join(" ");
        let first = match text.find(['.', '!', '?']) {
            Some(end) => &text[..=end],
            None => text.as_str(),
        };

        if first.chars().count() <= SUMMARY_MAX_CHARS {
            return first.to_string();
        }
        let cut: String = first.chars().take(SUMMARY_MAX_CHARS - 3).collect();
        format!("{}...", cut.trim_end())
    }
}

#[async_trait::async_trait]
impl MessageAnalyzer for PatternAnalyzer {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn extract(&self, message: &str) -> Result<ExtractedInfo, AnalyzerError> {
        Ok(self.extract_sync(message))
    }

    async fn summarize(&self, message: &str) -> Result<String, AnalyzerError> {
        Ok(self.summarize_sync(message))
    }
}
