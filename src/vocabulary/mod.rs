//! Vocabulary of matchable keywords.
//!
//! Built fresh from collaborator-supplied target metadata:
//! - Pattern: validated directory patterns for inclusion/exclusion
//! - Case: case folding and per-keyword case-sensitivity resolution
//! - Headings: heading fragments contributed as keywords
//! - Trie: folded char trie used by the scanner
//! - Index: the immutable keyword -> target(s) mapping

pub mod case;
pub mod headings;
pub mod index;
pub mod pattern;
pub mod trie;

pub use case::{fold, fold_char};
pub use headings::HeadingFilter;
pub use index::{InclusionRules, Keyword, VocabularyEntry, VocabularyIndex};
pub use pattern::{DirectoryPattern, PatternError};
pub use trie::{KeywordTrie, PrefixMatch};
