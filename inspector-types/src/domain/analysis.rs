//! Fields extracted from a message body, and the highlighted rendering of it.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured output of the message analyzer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInfo {
    /// Confirmation code found in the message (e.g. from Telegram, WhatsApp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "48213")]
    pub confirmation_code: Option<String>,
    /// Link found in the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Other important information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
}

impl ExtractedInfo {
    /// Drops blank values some models return instead of omitting the field.
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        };
        Self {
            confirmation_code: clean(self.confirmation_code),
            link: clean(self.link),
            other: clean(self.other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.confirmation_code.is_none() && self.link.is_none() && self.other.is_none()
    }
}

/// A piece of a message body, tagged for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Segment {
    Text(String),
    Link(String),
    Code(String),
}

/// Splits `message` around every occurrence of the extracted link, then of the code.
pub fn highlight(message: &str, info: &ExtractedInfo) -> Vec<Segment> {
    let mut segments = vec![Segment::Text(message.to_string())];

    if let Some(link) = info.link.as_deref() {
        segments = split_text_segments(segments, link, |s| Segment::Link(s.to_string()));
    }
    if let Some(code) = info.confirmation_code.as_deref() {
        segments = split_text_segments(segments, code, |s| Segment::Code(s.to_string()));
    }

    segments
}

fn split_text_segments(
    segments: Vec<Segment>,
    term: &str,
    tag: impl Fn(&str) -> Segment,
) -> Vec<Segment> {
    if term.is_empty() {
        return segments;
    }

    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let Segment::Text(text) = segment else {
            out.push(segment);
            continue;
        };

        let mut parts = text.split(term).peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                out.push(Segment::Text(part.to_string()));
            }
            if parts.peek().is_some() {
                out.push(tag(term));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_link_and_code() {
        let info = ExtractedInfo {
            confirmation_code: Some("12345".into()),
            link: Some("https://t.me/x".into()),
            other: None,
        };

        let segments = highlight("Code 12345, open https://t.me/x now", &info);

        assert_eq!(
            segments,
            vec![
                Segment::Text("Code ".into()),
                Segment::Code("12345".into()),
                Segment::Text(", open ".into()),
                Segment::Link("https://t.me/x".into()),
                Segment::Text(" now".into()),
            ]
        );
    }

    #[test]
    fn test_code_inside_link_is_not_split() {
        let info = ExtractedInfo {
            confirmation_code: Some("99".into()),
            link: Some("https://a.io/99".into()),
            other: None,
        };

        let segments = highlight("https://a.io/99", &info);

        assert_eq!(segments, vec![Segment::Link("https://a.io/99".into())]);
    }

    #[test]
    fn test_nothing_extracted_returns_whole_message() {
        let segments = highlight("hello", &ExtractedInfo::default());
        assert_eq!(segments, vec![Segment::Text("hello".into())]);
    }

    #[test]
    fn test_normalized_drops_blank_fields() {
        let info = ExtractedInfo {
            confirmation_code: Some(" ".into()),
            link: Some("null".into()),
            other: Some(" note ".into()),
        }
        .normalized();
        assert_eq!(info.confirmation_code, None);
        assert_eq!(info.link, None);
        assert_eq!(info.other.as_deref(), Some("note"));
    }
}
