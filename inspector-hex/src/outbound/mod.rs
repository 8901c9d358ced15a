//! Outbound adapters owned by this crate: the message analyzers.

mod gemini;
mod patterns;

pub use gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiAnalyzer};
pub use patterns::PatternAnalyzer;
