//! Registry record types and line format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between a URL and its annotation on a registry line.
pub const ANNOTATION_SEPARATOR: &str = " - ";

/// A permanent marker that excludes a registry entry from processing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    /// The retrieved artifact exceeded the size threshold and was discarded.
    LargeFile,
    /// The entry was skipped by an operator.
    Skipped,
    /// Any other marker found in the file, kept verbatim.
    Other(String),
}

impl Annotation {
    /// Parses the text after the separator.
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "LARGE FILE" => Self::LargeFile,
            "SKIPPED" => Self::Skipped,
            other => Self::Other(other.to_string()),
        }
    }

    /// Text written after the separator.
    pub fn marker(&self) -> &str {
        match self {
            Self::LargeFile => "LARGE FILE",
            Self::Skipped => "SKIPPED",
            Self::Other(text) => text,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// One entry of the link registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl LinkRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            annotation: None,
        }
    }

    pub fn annotated(url: impl Into<String>, annotation: Annotation) -> Self {
        Self {
            url: url.into(),
            annotation: Some(annotation),
        }
    }

    /// Only unannotated records are ever fetched.
    pub fn is_processable(&self) -> bool {
        self.annotation.is_none()
    }

    /// Renders the record as a registry line (without terminator).
    pub fn to_line(&self) -> String {
        match &self.annotation {
            Some(annotation) => format!("{}{}{}", self.url, ANNOTATION_SEPARATOR, annotation),
            None => self.url.clone(),
        }
    }
}

/// Parses one raw registry line.
///
/// Returns `Ok(None)` for blank lines and comments. A URL part containing
/// whitespace or control characters (two links glued together, a binary
/// fragment) is rejected with a reason.
pub fn parse_line(raw: &str) -> Result<Option<LinkRecord>, String> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (url, annotation) = match line.split_once(ANNOTATION_SEPARATOR) {
        Some((url, note)) => (url.trim(), Some(Annotation::parse(note))),
        None => (line, None),
    };

    if let Some(bad) = url.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(format!("URL {:?} contains unexpected character {:?}", url, bad));
    }

    Ok(Some(LinkRecord {
        url: url.to_string(),
        annotation,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_url() {
        let record = parse_line("  https://example.com/reel/1  ").unwrap().unwrap();
        assert_eq!(record.url, "https://example.com/reel/1");
        assert!(record.is_processable());
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        assert_eq!(parse_line("# header").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
    }

    #[test]
    fn test_parse_annotation() {
        let record = parse_line("https://example.com/x - LARGE FILE").unwrap().unwrap();
        assert_eq!(record.url, "https://example.com/x");
        assert_eq!(record.annotation, Some(Annotation::LargeFile));
        assert!(!record.is_processable());

        let record = parse_line("https://example.com/y - private account")
            .unwrap()
            .unwrap();
        assert_eq!(
            record.annotation,
            Some(Annotation::Other("private account".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_glued_urls() {
        let err = parse_line("https://example.com/a https://example.com/b").unwrap_err();
        assert!(err.contains("unexpected character"));
        assert!(parse_line("https://example.com/\u{0}x").is_err());
    }

    #[test]
    fn test_to_line_round_trips_marker() {
        let record = LinkRecord::annotated("https://example.com/x", Annotation::LargeFile);
        assert_eq!(record.to_line(), "https://example.com/x - LARGE FILE");
        assert_eq!(parse_line(&record.to_line()).unwrap().unwrap(), record);
    }
}
