//! Linker settings.
//!
//! Every field has a default so a partial `settings:` block in the config
//! file is enough. Defaults mirror the shipped behaviour of the linker.

use serde::{Deserialize, Serialize};

use crate::domain::{LinkFormat, LinkStyle};

/// All user-facing switches that shape vocabulary building, scanning and conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerSettings {
    /// Master switch; when off no virtual links are produced
    pub linker_activated: bool,

    // Matching
    pub match_any_parts_of_words: bool,
    pub match_beginning_of_words: bool,
    pub match_end_of_words: bool,
    pub suppress_suffix_for_sub_words: bool,
    pub only_link_once: bool,
    pub exclude_links_to_own_note: bool,
    pub exclude_links_in_current_line: bool,
    pub exclude_links_to_real_linked_files: bool,
    pub always_show_multiple_references: bool,
    pub excluded_keywords: Vec<String>,

    // Vocabulary
    pub include_all_files: bool,
    pub linker_directories: Vec<String>,
    pub excluded_directories: Vec<String>,
    pub excluded_directories_for_linking: Vec<String>,
    pub excluded_extensions: Vec<String>,
    pub include_aliases: bool,
    pub include_headers: bool,
    pub header_match_only_between_symbols: bool,
    pub header_match_start_symbol: String,
    pub header_match_end_symbol: String,
    pub tag_to_exclude_file: String,
    pub tag_to_include_file: String,

    // Case sensitivity
    pub match_case_sensitive: bool,
    pub capital_letter_proportion_for_automatic_match_case: f64,
    pub tag_to_ignore_case: String,
    pub tag_to_match_case: String,
    pub property_name_to_ignore_case: String,
    pub property_name_to_match_case: String,

    // Conversion
    /// Convert with the vault defaults below instead of the linker's own style
    pub use_default_link_style_for_conversion: bool,
    pub default_use_markdown_links: bool,
    pub default_link_format: LinkFormat,
    pub use_markdown_links: bool,
    pub link_format: LinkFormat,
}

impl Default for LinkerSettings {
    fn default() -> Self {
        Self {
            linker_activated: true,
            match_any_parts_of_words: false,
            match_beginning_of_words: true,
            match_end_of_words: true,
            suppress_suffix_for_sub_words: false,
            only_link_once: true,
            exclude_links_to_own_note: true,
            exclude_links_in_current_line: false,
            exclude_links_to_real_linked_files: true,
            always_show_multiple_references: false,
            excluded_keywords: Vec::new(),
            include_all_files: true,
            linker_directories: vec!["Glossary".to_string()],
            excluded_directories: Vec::new(),
            excluded_directories_for_linking: Vec::new(),
            excluded_extensions: vec![".mp4".to_string()],
            include_aliases: true,
            include_headers: true,
            header_match_only_between_symbols: false,
            header_match_start_symbol: String::new(),
            header_match_end_symbol: String::new(),
            tag_to_exclude_file: "linker-exclude".to_string(),
            tag_to_include_file: "linker-include".to_string(),
            match_case_sensitive: false,
            capital_letter_proportion_for_automatic_match_case: 0.75,
            tag_to_ignore_case: "linker-ignore-case".to_string(),
            tag_to_match_case: "linker-match-case".to_string(),
            property_name_to_ignore_case: "linker-ignore-case".to_string(),
            property_name_to_match_case: "linker-match-case".to_string(),
            use_default_link_style_for_conversion: true,
            default_use_markdown_links: false,
            default_link_format: LinkFormat::Shortest,
            use_markdown_links: false,
            link_format: LinkFormat::Shortest,
        }
    }
}

impl LinkerSettings {
    /// Link syntax used for conversions
    pub fn link_style(&self) -> LinkStyle {
        let markdown = if self.use_default_link_style_for_conversion {
            self.default_use_markdown_links
        } else {
            self.use_markdown_links
        };
        if markdown {
            LinkStyle::Markdown
        } else {
            LinkStyle::Wiki
        }
    }

    /// Link path format used for conversions
    pub fn conversion_link_format(&self) -> LinkFormat {
        if self.use_default_link_style_for_conversion {
            self.default_link_format
        } else {
            self.link_format
        }
    }

    /// Add a keyword to the exclusion list; returns false if already present
    pub fn exclude_keyword(&mut self, keyword: &str) -> bool {
        let keyword = keyword.trim();
        if keyword.is_empty() || self.excluded_keywords.iter().any(|k| k == keyword) {
            return false;
        }
        self.excluded_keywords.push(keyword.to_string());
        true
    }
}
