//! Match scanner: turns document text into non-overlapping match spans.
//!
//! # Rules
//!
//! - **Longest match**: at each offset the longest acceptable keyword wins.
//! - **Boundaries**: whole-token matches always qualify; partial matches
//!   only under the prefix/suffix/any-part modes of the policy.
//! - **Exclusion / only-link-once**: an occurrence whose folded text is an
//!   excluded keyword, or was already emitted under only-link-once, is
//!   consumed without producing a span.
//! - **Protected ranges**: no span ever intersects one.
//! - **Quiet**: the scanner never fails; no match simply means no span.

pub mod boundary;
pub mod policy;

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{KeywordKind, LinkCandidate, MatchSpan};
use crate::vocabulary::{fold_char, VocabularyIndex};

pub use boundary::is_boundary;
pub use policy::ScanPolicy;

/// Scans text against one vocabulary under one policy
pub struct MatchScanner<'a> {
    index: &'a VocabularyIndex,
    policy: &'a ScanPolicy,
}

impl<'a> MatchScanner<'a> {
    pub fn new(index: &'a VocabularyIndex, policy: &'a ScanPolicy) -> Self {
        Self { index, policy }
    }

    /// Scan `text`, returning spans sorted by `start`
    pub fn scan(&self, text: &str) -> Vec<MatchSpan> {
        let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let original: Vec<char> = text.chars().collect();
        let folded: Vec<char> = original.iter().map(|&c| fold_char(c)).collect();
        let n = original.len();
        let byte_at = |i: usize| offsets.get(i).copied().unwrap_or(text.len());

        let trie = self.index.trie();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut spans = Vec::new();
        let mut i = 0;

        if trie.is_empty() {
            return spans;
        }

        while i < n {
            if let Some(protected_end) = self.policy.protected_end_at(byte_at(i)) {
                i = offsets.partition_point(|&b| b < protected_end);
                continue;
            }

            let left_bounded = i == 0 || is_boundary(original[i - 1]);
            if !left_bounded && !self.policy.allows_unbounded_start() {
                i += 1;
                continue;
            }

            let mut chosen: Option<(usize, Vec<LinkCandidate>, bool)> = None;
            for found in trie.prefix_matches(&folded, &original, i).into_iter().rev() {
                let end = i + found.len;
                let right_bounded = end == n || is_boundary(original[end]);
                let Some(is_sub_word) = self.policy.accepts(left_bounded, right_bounded) else {
                    continue;
                };
                if self.policy.intersects_protected(byte_at(i), byte_at(end)) {
                    continue;
                }

                let candidates: Vec<LinkCandidate> = found
                    .candidates
                    .into_iter()
                    .filter(|c| !self.policy.is_excluded_target(&c.target))
                    .collect();
                if candidates.is_empty() {
                    continue;
                }

                chosen = Some((end, candidates, is_sub_word));
                break;
            }

            let Some((end, candidates, is_sub_word)) = chosen else {
                i += 1;
                continue;
            };

            let key: String = folded[i..end].iter().collect();
            let suppressed = self.policy.is_excluded_keyword(&key)
                || (self.policy.only_link_once && emitted.contains(&key));

            if !suppressed {
                let (start_byte, end_byte) = (byte_at(i), byte_at(end));
                let is_alias = candidates.iter().any(|c| c.kind == KeywordKind::Alias);
                let is_header_fragment = candidates
                    .iter()
                    .any(|c| matches!(c.kind, KeywordKind::Heading { .. }));

                spans.push(MatchSpan {
                    start: start_byte,
                    end: end_byte,
                    source_text: text[start_byte..end_byte].to_string(),
                    candidates,
                    is_alias,
                    is_header_fragment,
                    is_sub_word,
                });
                emitted.insert(key);
            }

            i = end;
        }

        debug!(spans = spans.len(), chars = n, "Scan complete");
        spans
    }
}

/// Convenience wrapper around [`MatchScanner::scan`]
pub fn scan(text: &str, index: &VocabularyIndex, policy: &ScanPolicy) -> Vec<MatchSpan> {
    MatchScanner::new(index, policy).scan(text)
}
