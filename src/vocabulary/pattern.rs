//! Directory patterns for vocabulary inclusion and exclusion.
//!
//! A list of directory names (regex fragments) is compiled once into
//! `(^|/)(d1|d2|...)/`. A list that fails to compile is recorded as a
//! configuration error and matches nothing; scanning never sees the error.

use regex::Regex;
use thiserror::Error;

/// Directory pattern compile failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Invalid directory pattern '{pattern}': {message}")]
    Invalid { pattern: String, message: String },
}

/// A compiled directory pattern, or the record of why it could not be compiled
#[derive(Debug, Clone)]
pub struct DirectoryPattern {
    regex: Option<Regex>,
    error: Option<PatternError>,
}

impl DirectoryPattern {
    /// Compile a list of directory names
    pub fn compile<S: AsRef<str>>(directories: &[S]) -> Self {
        let parts: Vec<&str> = directories
            .iter()
            .map(|d| d.as_ref().trim().trim_matches('/'))
            .filter(|d| !d.is_empty())
            .collect();

        if parts.is_empty() {
            return Self::nothing();
        }

        let source = format!("(^|/)({})/", parts.join("|"));
        match Regex::new(&source) {
            Ok(regex) => Self {
                regex: Some(regex),
                error: None,
            },
            Err(e) => Self {
                regex: None,
                error: Some(PatternError::Invalid {
                    pattern: source,
                    message: e.to_string(),
                }),
            },
        }
    }

    /// A pattern that matches no path
    pub fn nothing() -> Self {
        Self {
            regex: None,
            error: None,
        }
    }

    /// Check whether a vault-relative path lies inside one of the directories
    pub fn matches(&self, path: &str) -> bool {
        self.regex.as_ref().map_or(false, |r| r.is_match(path))
    }

    /// The compile error, if the pattern was malformed
    pub fn error(&self) -> Option<&PatternError> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_nested_directories() {
        let pattern = DirectoryPattern::compile(&["Glossary", "Archive/Old"]);
        assert!(pattern.matches("Glossary/Cell.md"));
        assert!(pattern.matches("Biology/Glossary/Cell.md"));
        assert!(pattern.matches("Archive/Old/Note.md"));
        assert!(!pattern.matches("MyGlossary/Cell.md"));
        assert!(!pattern.matches("Glossary.md"));
        assert!(pattern.error().is_none());
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let pattern = DirectoryPattern::compile::<&str>(&[]);
        assert!(!pattern.matches("Glossary/Cell.md"));
        assert!(!pattern.matches("/x.md"));
        let blank = DirectoryPattern::compile(&["  ", "/"]);
        assert!(!blank.matches("a/b.md"));
    }

    #[test]
    fn test_malformed_pattern_matches_nothing() {
        let pattern = DirectoryPattern::compile(&["Glos(sary"]);
        assert!(!pattern.matches("Glos(sary/Cell.md"));
        assert!(matches!(pattern.error(), Some(PatternError::Invalid { .. })));
    }
}
