//! Case folding and case-sensitivity resolution.

use crate::config::LinkerSettings;
use crate::domain::{CaseMode, TargetMeta};

/// Fold one char to lower case without changing the char count.
///
/// Chars whose lowercase form expands to several chars are kept as-is.
pub fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Fold a whole string with [`fold_char`]
pub fn fold(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Proportion of uppercase letters among all chars of `keyword`
pub fn uppercase_ratio(keyword: &str) -> f64 {
    let total = keyword.chars().count();
    if total == 0 {
        return 0.0;
    }
    let upper = keyword.chars().filter(|c| c.is_uppercase()).count();
    upper as f64 / total as f64
}

/// Explicit per-file override, from tags first and then frontmatter properties
pub fn case_mode_for(meta: &TargetMeta, settings: &LinkerSettings) -> CaseMode {
    if meta.has_tag(&settings.tag_to_match_case)
        || meta.property_is_true(&settings.property_name_to_match_case)
    {
        CaseMode::Sensitive
    } else if meta.has_tag(&settings.tag_to_ignore_case)
        || meta.property_is_true(&settings.property_name_to_ignore_case)
    {
        CaseMode::Insensitive
    } else {
        CaseMode::Auto
    }
}

/// Resolve whether one keyword is compared case-sensitively.
///
/// Override > uppercase heuristic > global default.
pub fn is_case_sensitive(mode: CaseMode, keyword: &str, settings: &LinkerSettings) -> bool {
    match mode {
        CaseMode::Sensitive => true,
        CaseMode::Insensitive => false,
        CaseMode::Auto => {
            uppercase_ratio(keyword) > settings.capital_letter_proportion_for_automatic_match_case
                || settings.match_case_sensitive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_keeps_char_count() {
        assert_eq!(fold("HeLLo"), "hello");
        // 'İ' lowercases to two chars; it is left alone
        assert_eq!(fold("İx").chars().count(), 2);
        assert_eq!(fold("ÄÖÜ"), "äöü");
    }

    #[test]
    fn test_uppercase_ratio() {
        assert_eq!(uppercase_ratio("DNA"), 1.0);
        assert_eq!(uppercase_ratio("Cell"), 0.25);
        assert_eq!(uppercase_ratio(""), 0.0);
    }

    #[test]
    fn test_resolution_priority() {
        let settings = LinkerSettings::default();

        // Heuristic: acronyms are case-sensitive, ordinary words are not
        assert!(is_case_sensitive(CaseMode::Auto, "DNA", &settings));
        assert!(!is_case_sensitive(CaseMode::Auto, "Cell", &settings));

        // Explicit override beats the heuristic
        assert!(!is_case_sensitive(CaseMode::Insensitive, "DNA", &settings));
        assert!(is_case_sensitive(CaseMode::Sensitive, "cell", &settings));

        // Global default applies when the heuristic does not fire
        let strict = LinkerSettings {
            match_case_sensitive: true,
            ..Default::default()
        };
        assert!(is_case_sensitive(CaseMode::Auto, "cell", &strict));
    }

    #[test]
    fn test_case_mode_from_tags_and_properties() {
        let settings = LinkerSettings::default();

        let tagged = TargetMeta::new("a.md").with_tags(["linker-match-case"]);
        assert_eq!(case_mode_for(&tagged, &settings), CaseMode::Sensitive);

        let property = TargetMeta::new("b.md")
            .with_property("linker-ignore-case", serde_json::Value::Bool(true));
        assert_eq!(case_mode_for(&property, &settings), CaseMode::Insensitive);

        assert_eq!(case_mode_for(&TargetMeta::new("c.md"), &settings), CaseMode::Auto);
    }
}
