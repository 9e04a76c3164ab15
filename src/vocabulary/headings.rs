//! Heading fragments contributed to the vocabulary.

use crate::config::LinkerSettings;

/// How heading texts turn into keywords
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingFilter {
    /// Whole heading text is a keyword
    Whole,
    /// Only the text between the first start marker and the next end marker
    Between { start: String, end: String },
    /// Marker configuration is unusable; no heading contributes
    Invalid(String),
}

impl HeadingFilter {
    pub fn from_settings(settings: &LinkerSettings) -> Self {
        if !settings.header_match_only_between_symbols {
            return Self::Whole;
        }

        let start = settings.header_match_start_symbol.as_str();
        let end = settings.header_match_end_symbol.as_str();

        if start.is_empty() || end.is_empty() {
            Self::Invalid("heading start and end symbols must both be set".to_string())
        } else if start == end {
            Self::Invalid(format!(
                "heading start and end symbols must differ (both are '{}')",
                start
            ))
        } else {
            Self::Between {
                start: start.to_string(),
                end: end.to_string(),
            }
        }
    }

    /// Configuration error, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Invalid(message) => Some(message),
            _ => None,
        }
    }

    /// Extract the keyword a heading contributes, if any
    pub fn fragment(&self, heading: &str) -> Option<String> {
        let fragment = match self {
            Self::Whole => heading,
            Self::Between { start, end } => {
                let open = heading.find(start.as_str())?;
                let rest = &heading[open + start.len()..];
                let close = rest.find(end.as_str())?;
                &rest[..close]
            }
            Self::Invalid(_) => return None,
        };

        let fragment = fragment.trim();
        if fragment.is_empty() {
            None
        } else {
            Some(fragment.to_string())
        }
    }
}
