//! Char trie over case-folded keywords.
//!
//! Keywords are inserted folded so one walk serves both case modes; each
//! terminal keeps the original keyword so case-sensitive entries can be
//! checked against the unfolded text.

use std::collections::HashMap;

use crate::domain::LinkCandidate;

use super::case::fold_char;

#[derive(Debug, Clone)]
struct Terminal {
    keyword: Vec<char>,
    case_sensitive: bool,
    candidate: LinkCandidate,
}

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<char, usize>,
    terminals: Vec<Terminal>,
}

/// Keywords matching at a position, one entry per keyword length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch {
    /// Length in chars
    pub len: usize,
    /// Candidates whose case rule accepts the text, in insertion order, one per target
    pub candidates: Vec<LinkCandidate>,
}

#[derive(Debug, Clone)]
pub struct KeywordTrie {
    nodes: Vec<Node>,
    keywords: usize,
}

impl Default for KeywordTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            keywords: 0,
        }
    }

    /// Number of inserted (keyword, candidate) pairs
    pub fn len(&self) -> usize {
        self.keywords
    }

    pub fn is_empty(&self) -> bool {
        self.keywords == 0
    }

    pub fn insert(&mut self, keyword: &str, case_sensitive: bool, candidate: LinkCandidate) {
        if keyword.is_empty() {
            return;
        }

        let mut node = 0;
        for c in keyword.chars().map(fold_char) {
            node = match self.nodes[node].children.get(&c) {
                Some(&next) => next,
                None => {
                    self.nodes.push(Node::default());
                    let next = self.nodes.len() - 1;
                    self.nodes[node].children.insert(c, next);
                    next
                }
            };
        }

        self.nodes[node].terminals.push(Terminal {
            keyword: keyword.chars().collect(),
            case_sensitive,
            candidate,
        });
        self.keywords += 1;
    }

    /// All keywords that start at `start`, shortest first.
    ///
    /// `folded` and `original` are the same text, folded and unfolded, as chars.
    pub fn prefix_matches(&self, folded: &[char], original: &[char], start: usize) -> Vec<PrefixMatch> {
        let mut found = Vec::new();
        let mut node = 0;

        for (offset, c) in folded[start..].iter().enumerate() {
            node = match self.nodes[node].children.get(c) {
                Some(&next) => next,
                None => break,
            };

            let terminals = &self.nodes[node].terminals;
            if terminals.is_empty() {
                continue;
            }

            let len = offset + 1;
            let text = &original[start..start + len];
            let mut candidates: Vec<LinkCandidate> = Vec::new();
            for terminal in terminals {
                if terminal.case_sensitive && terminal.keyword.as_slice() != text {
                    continue;
                }
                if candidates.iter().any(|c| c.target == terminal.candidate.target) {
                    continue;
                }
                candidates.push(terminal.candidate.clone());
            }

            if !candidates.is_empty() {
                found.push(PrefixMatch { len, candidates });
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KeywordKind, TargetId};

    fn candidate(path: &str) -> LinkCandidate {
        LinkCandidate {
            target: TargetId::new(path),
            kind: KeywordKind::Name,
        }
    }

    fn chars(s: &str) -> (Vec<char>, Vec<char>) {
        let original: Vec<char> = s.chars().collect();
        let folded = original.iter().map(|&c| fold_char(c)).collect();
        (folded, original)
    }

    #[test]
    fn test_prefix_matches_shortest_first() {
        let mut trie = KeywordTrie::new();
        trie.insert("Cell", false, candidate("Cell.md"));
        trie.insert("Cellular", false, candidate("Cellular.md"));

        let (folded, original) = chars("cellular respiration");
        let found = trie.prefix_matches(&folded, &original, 0);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].len, 4);
        assert_eq!(found[1].len, 8);
        assert_eq!(found[1].candidates[0].target.as_str(), "Cellular.md");
    }

    #[test]
    fn test_case_sensitive_terminal_checks_original() {
        let mut trie = KeywordTrie::new();
        trie.insert("DNA", true, candidate("DNA.md"));

        let (folded, original) = chars("dna and DNA");
        assert!(trie.prefix_matches(&folded, &original, 0).is_empty());
        assert_eq!(trie.prefix_matches(&folded, &original, 8).len(), 1);
    }

    #[test]
    fn test_duplicate_keywords_keep_all_targets() {
        let mut trie = KeywordTrie::new();
        trie.insert("Cell", false, candidate("Biology/Cell.md"));
        trie.insert("Cell", false, candidate("Excel/Cell.md"));
        trie.insert("cell", false, candidate("Biology/Cell.md"));
        assert_eq!(trie.len(), 3);

        let (folded, original) = chars("Cell");
        let found = trie.prefix_matches(&folded, &original, 0);
        assert_eq!(found.len(), 1);
        let targets: Vec<&str> = found[0].candidates.iter().map(|c| c.target.as_str()).collect();
        assert_eq!(targets, vec!["Biology/Cell.md", "Excel/Cell.md"]);
    }
}
