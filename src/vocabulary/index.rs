//! Vocabulary index: keyword -> target(s) mapping built from target metadata.
//!
//! The index is immutable once built. Any settings change that affects the
//! vocabulary, or any change to the set of targets, rebuilds it wholesale.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::LinkerSettings;
use crate::domain::{CaseMode, KeywordKind, LinkCandidate, TargetId, TargetMeta};

use super::case::{case_mode_for, is_case_sensitive};
use super::headings::HeadingFilter;
use super::pattern::DirectoryPattern;
use super::trie::KeywordTrie;

/// One matchable keyword of a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub text: String,
    pub kind: KeywordKind,
    /// Resolved case rule for this keyword
    pub case_sensitive: bool,
}

/// A target and its keywords
#[derive(Debug, Clone, Serialize)]
pub struct VocabularyEntry {
    pub target: TargetId,
    /// Distinct keywords in contribution order: name, aliases, heading fragments
    pub keywords: Vec<Keyword>,
    pub case_mode: CaseMode,
    /// Whether the target is in linking scope
    pub included: bool,
}

/// Eligibility rules derived from settings
#[derive(Debug, Clone)]
pub struct InclusionRules {
    include_all: bool,
    include_dirs: DirectoryPattern,
    exclude_dirs: DirectoryPattern,
    include_tag: String,
    exclude_tag: String,
    excluded_extensions: Vec<String>,
}

impl InclusionRules {
    pub fn from_settings(settings: &LinkerSettings) -> Self {
        Self {
            include_all: settings.include_all_files,
            include_dirs: DirectoryPattern::compile(&settings.linker_directories),
            exclude_dirs: DirectoryPattern::compile(&settings.excluded_directories),
            include_tag: settings.tag_to_include_file.clone(),
            exclude_tag: settings.tag_to_exclude_file.clone(),
            excluded_extensions: settings
                .excluded_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Pattern compile errors, for logging
    pub fn errors(&self) -> Vec<String> {
        [&self.include_dirs, &self.exclude_dirs]
            .into_iter()
            .filter_map(|p| p.error().map(|e| e.to_string()))
            .collect()
    }

    /// Decide whether a target is in linking scope.
    ///
    /// The include tag always includes; the exclude tag beats both
    /// "include all" and directory-based inclusion.
    pub fn is_included(&self, meta: &TargetMeta) -> bool {
        let path = meta.path.to_lowercase();
        if self
            .excluded_extensions
            .iter()
            .any(|ext| !ext.is_empty() && path.ends_with(ext.as_str()))
        {
            return false;
        }

        if meta.has_tag(&self.include_tag) {
            return true;
        }
        if meta.has_tag(&self.exclude_tag) {
            return false;
        }
        if self.include_dirs.matches(&meta.path) {
            return true;
        }

        self.include_all && !self.exclude_dirs.matches(&meta.path)
    }
}

/// Keyword -> target(s) mapping for one vault
#[derive(Debug, Clone)]
pub struct VocabularyIndex {
    entries: Vec<VocabularyEntry>,
    trie: KeywordTrie,
    /// Lower-cased link name -> number of targets sharing it
    link_names: HashMap<String, usize>,
    config_errors: Vec<String>,
}

impl Default for VocabularyIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl VocabularyIndex {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            trie: KeywordTrie::new(),
            link_names: HashMap::new(),
            config_errors: Vec::new(),
        }
    }

    /// Build the index. Output depends only on `targets` (in order) and `settings`.
    pub fn build(targets: &[TargetMeta], settings: &LinkerSettings) -> Self {
        let rules = InclusionRules::from_settings(settings);
        let headings = HeadingFilter::from_settings(settings);

        let mut config_errors = rules.errors();
        if let Some(error) = headings.error() {
            config_errors.push(error.to_string());
        }
        for error in &config_errors {
            warn!(%error, "Vocabulary configuration error");
        }

        let mut entries = Vec::with_capacity(targets.len());
        let mut trie = KeywordTrie::new();
        let mut link_names: HashMap<String, usize> = HashMap::new();

        for meta in targets {
            *link_names
                .entry(meta.id.link_name().to_lowercase())
                .or_insert(0) += 1;

            let entry = build_entry(meta, settings, &rules, &headings);
            if entry.included {
                for keyword in &entry.keywords {
                    trie.insert(
                        &keyword.text,
                        keyword.case_sensitive,
                        LinkCandidate {
                            target: entry.target.clone(),
                            kind: keyword.kind.clone(),
                        },
                    );
                }
            }
            entries.push(entry);
        }

        debug!(
            targets = entries.len(),
            keywords = trie.len(),
            "Vocabulary built"
        );

        Self {
            entries,
            trie,
            link_names,
            config_errors,
        }
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    /// Entries in linking scope
    pub fn included(&self) -> impl Iterator<Item = &VocabularyEntry> {
        self.entries.iter().filter(|e| e.included)
    }

    pub fn entry(&self, target: &TargetId) -> Option<&VocabularyEntry> {
        self.entries.iter().find(|e| &e.target == target)
    }

    pub fn contains_target(&self, target: &TargetId) -> bool {
        self.entry(target).is_some()
    }

    pub fn trie(&self) -> &KeywordTrie {
        &self.trie
    }

    pub fn config_errors(&self) -> &[String] {
        &self.config_errors
    }

    /// Whether no other known target shares this target's link name
    pub fn is_unique_link_name(&self, target: &TargetId) -> bool {
        self.link_names
            .get(&target.link_name().to_lowercase())
            .map_or(true, |&count| count <= 1)
    }

    /// Resolve the target part of a real link (`name`, `dir/name`, `name.md`,
    /// optionally followed by `#heading` or `|label`) to a known target.
    pub fn resolve_link_text(&self, link: &str) -> Option<&TargetId> {
        let link = link.split(['|', '#']).next().unwrap_or("").trim();
        let link = link.trim_start_matches("./").trim_start_matches('/');
        if link.is_empty() {
            return None;
        }
        let link = link.strip_suffix(".md").unwrap_or(link).to_lowercase();

        if link.contains('/') {
            let suffix = format!("/{}", link);
            self.entries
                .iter()
                .map(|e| &e.target)
                .find(|t| {
                    let path = t.link_path().to_lowercase();
                    path == link || path.ends_with(&suffix)
                })
        } else {
            self.entries
                .iter()
                .map(|e| &e.target)
                .find(|t| t.link_name().to_lowercase() == link)
        }
    }
}

fn build_entry(
    meta: &TargetMeta,
    settings: &LinkerSettings,
    rules: &InclusionRules,
    headings: &HeadingFilter,
) -> VocabularyEntry {
    let case_mode = case_mode_for(meta, settings);
    let mut keywords: Vec<Keyword> = Vec::new();

    let mut push = |text: &str, kind: KeywordKind| {
        let text = text.trim();
        if text.is_empty() || keywords.iter().any(|k| k.text == text) {
            return;
        }
        keywords.push(Keyword {
            text: text.to_string(),
            kind,
            case_sensitive: is_case_sensitive(case_mode, text, settings),
        });
    };

    push(&meta.name, KeywordKind::Name);

    if settings.include_aliases {
        for alias in &meta.aliases {
            push(alias, KeywordKind::Alias);
        }
    }

    if settings.include_headers {
        for heading in &meta.headings {
            if let Some(fragment) = headings.fragment(heading) {
                push(
                    &fragment,
                    KeywordKind::Heading {
                        anchor: heading.trim().to_string(),
                    },
                );
            }
        }
    }

    VocabularyEntry {
        target: meta.id.clone(),
        keywords,
        case_mode,
        included: rules.is_included(meta),
    }
}
