//! Scan policy: word-boundary modes, exclusions and protected ranges.

use std::collections::HashSet;

use crate::config::LinkerSettings;
use crate::domain::TargetId;
use crate::surface::floor_char_boundary;
use crate::vocabulary::fold;

/// Everything the scanner needs besides the text and the vocabulary
#[derive(Debug, Clone, Default)]
pub struct ScanPolicy {
    pub match_any_parts_of_words: bool,
    pub match_beginning_of_words: bool,
    pub match_end_of_words: bool,
    pub only_link_once: bool,
    /// Folded excluded keywords
    excluded_keywords: HashSet<String>,
    /// Targets that must not be linked (own note, already linked files)
    excluded_targets: HashSet<TargetId>,
    /// Sorted, merged, non-empty byte ranges
    protected: Vec<(usize, usize)>,
}

impl ScanPolicy {
    /// Whole-word matching only, nothing excluded, nothing protected
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &LinkerSettings) -> Self {
        let mut policy = Self {
            match_any_parts_of_words: settings.match_any_parts_of_words,
            match_beginning_of_words: settings.match_beginning_of_words,
            match_end_of_words: settings.match_end_of_words,
            only_link_once: settings.only_link_once,
            ..Default::default()
        };
        for keyword in &settings.excluded_keywords {
            policy.exclude_keyword(keyword);
        }
        policy
    }

    pub fn exclude_keyword(&mut self, keyword: &str) {
        let keyword = keyword.trim();
        if !keyword.is_empty() {
            self.excluded_keywords.insert(fold(keyword));
        }
    }

    pub fn exclude_target(&mut self, target: TargetId) {
        self.excluded_targets.insert(target);
    }

    /// Add a byte range the scanner must not produce spans over
    pub fn protect(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        self.protected.push((start, end));
        self.protected.sort_unstable();

        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(self.protected.len());
        for &(s, e) in &self.protected {
            match merged.last_mut() {
                Some(last) if s <= last.1 => last.1 = last.1.max(e),
                _ => merged.push((s, e)),
            }
        }
        self.protected = merged;
    }

    pub fn with_protected<I>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        for (start, end) in ranges {
            self.protect(start, end);
        }
        self
    }

    /// Protect the whole line holding `cursor`
    pub fn protect_line_at(&mut self, text: &str, cursor: usize) {
        let cursor = floor_char_boundary(text, cursor);
        let start = text[..cursor].rfind('\n').map_or(0, |i| i + 1);
        let end = text[cursor..].find('\n').map_or(text.len(), |i| cursor + i);
        // An empty line has nothing to protect
        self.protect(start, end);
    }

    pub fn protected_ranges(&self) -> &[(usize, usize)] {
        &self.protected
    }

    pub fn is_excluded_keyword(&self, folded: &str) -> bool {
        self.excluded_keywords.contains(folded)
    }

    pub fn is_excluded_target(&self, target: &TargetId) -> bool {
        self.excluded_targets.contains(target)
    }

    /// End of the protected range containing `offset`, if any
    pub fn protected_end_at(&self, offset: usize) -> Option<usize> {
        let idx = self.protected.partition_point(|&(_, end)| end <= offset);
        match self.protected.get(idx) {
            Some(&(start, end)) if start <= offset => Some(end),
            _ => None,
        }
    }

    /// Whether `[start, end)` touches any protected range
    pub fn intersects_protected(&self, start: usize, end: usize) -> bool {
        let idx = self.protected.partition_point(|&(_, e)| e <= start);
        self.protected
            .get(idx)
            .map_or(false, |&(s, _)| s < end)
    }

    /// Decide whether a match with the given boundary situation is linkable.
    ///
    /// Returns `Some(is_sub_word)` when accepted.
    pub fn accepts(&self, left_bounded: bool, right_bounded: bool) -> Option<bool> {
        if left_bounded && right_bounded {
            Some(false)
        } else if self.match_any_parts_of_words
            || (self.match_beginning_of_words && left_bounded)
            || (self.match_end_of_words && right_bounded)
        {
            Some(true)
        } else {
            None
        }
    }

    /// Whether a match may start at a position that is not preceded by a boundary
    pub fn allows_unbounded_start(&self) -> bool {
        self.match_any_parts_of_words || self.match_end_of_words
    }
}
