//! Message analyzer port.
//!
//! The analyzer is a black box: free text in, structured fields out.

use crate::domain::ExtractedInfo;

/// Error type for analyzer operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Analyzer request failed: {0}")]
    Request(String),

    #[error("Analyzer returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Port trait for message analyzers.
#[async_trait::async_trait]
pub trait MessageAnalyzer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Extracts the confirmation code, link and other key facts.
    async fn extract(&self, message: &str) -> Result<ExtractedInfo, AnalyzerError>;

    /// Produces a concise summary of the message.
    async fn summarize(&self, message: &str) -> Result<String, AnalyzerError>;
}
