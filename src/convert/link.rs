//! Replacement text for a converted link.

use crate::config::LinkerSettings;
use crate::domain::{LinkFormat, LinkStyle, TargetId};
use crate::vocabulary::VocabularyIndex;

use super::table::escape_cell_text;

/// Builds persisted link text for one source document
#[derive(Debug, Clone)]
pub struct LinkBuilder<'a> {
    index: &'a VocabularyIndex,
    style: LinkStyle,
    format: LinkFormat,
    /// Directory of the document the link is written into
    source_dir: String,
}

impl<'a> LinkBuilder<'a> {
    pub fn new(index: &'a VocabularyIndex, style: LinkStyle, format: LinkFormat) -> Self {
        Self {
            index,
            style,
            format,
            source_dir: String::new(),
        }
    }

    pub fn from_settings(index: &'a VocabularyIndex, settings: &LinkerSettings) -> Self {
        Self::new(index, settings.link_style(), settings.conversion_link_format())
    }

    /// Set the document the links will live in (vault-relative path)
    pub fn for_source(mut self, source: &str) -> Self {
        let source = source.replace('\\', "/");
        self.source_dir = match source.rfind('/') {
            Some(i) => source[..i].to_string(),
            None => String::new(),
        };
        self
    }

    pub fn style(&self) -> LinkStyle {
        self.style
    }

    pub fn format(&self) -> LinkFormat {
        self.format
    }

    /// Target path in the configured format, without extension or anchor
    pub fn path_for(&self, target: &TargetId) -> String {
        match self.format {
            LinkFormat::Shortest => {
                if self.index.is_unique_link_name(target) {
                    target.link_name().to_string()
                } else {
                    target.link_path().to_string()
                }
            }
            LinkFormat::Relative => relative_path(&self.source_dir, target),
            LinkFormat::Absolute => target.link_path().to_string(),
        }
    }

    /// Build the link that replaces `text`.
    ///
    /// `in_table` escapes `\` and `|` in the label, and the wiki separator,
    /// so the link does not split its table cell.
    pub fn build(
        &self,
        target: &TargetId,
        anchor: Option<&str>,
        text: &str,
        in_table: bool,
    ) -> String {
        let path = self.path_for(target);
        let anchor = anchor.map(str::trim).filter(|a| !a.is_empty());

        if self.style == LinkStyle::Wiki
            && self.format == LinkFormat::Shortest
            && anchor.is_none()
            && path == text
        {
            return format!("[[{}]]", path);
        }

        let full = match anchor {
            Some(anchor) => format!("{}#{}", path, anchor),
            None => path,
        };
        let label = if in_table {
            escape_cell_text(text)
        } else {
            text.to_string()
        };

        match self.style {
            LinkStyle::Markdown => format!("[{}]({})", label, full.replace(' ', "%20")),
            LinkStyle::Wiki if in_table => format!("[[{}\\|{}]]", full, label),
            LinkStyle::Wiki => format!("[[{}|{}]]", full, label),
        }
    }
}

/// `./` or `../` path from `source_dir` to the target, ending in its link name
fn relative_path(source_dir: &str, target: &TargetId) -> String {
    let from: Vec<&str> = source_dir.split('/').filter(|p| !p.is_empty()).collect();
    let to: Vec<&str> = target.dir().split('/').filter(|p| !p.is_empty()).collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let ups = from.len() - common;

    let mut path = if ups > 0 {
        "../".repeat(ups)
    } else {
        "./".to_string()
    };
    for part in &to[common..] {
        path.push_str(part);
        path.push('/');
    }
    path.push_str(target.link_name());
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TargetMeta;

    fn index() -> VocabularyIndex {
        let targets = vec![
            TargetMeta::new("Biology/Photosynthesis.md"),
            TargetMeta::new("Biology/Cell.md"),
            TargetMeta::new("Spreadsheets/Cell.md"),
            TargetMeta::new("Chemistry/Organic/Glucose.md"),
        ];
        VocabularyIndex::build(&targets, &LinkerSettings::default())
    }

    #[test]
    fn test_bare_form_when_name_matches_text() {
        let index = index();
        let links = LinkBuilder::new(&index, LinkStyle::Wiki, LinkFormat::Shortest);
        let target = TargetId::new("Biology/Photosynthesis.md");
        assert_eq!(links.build(&target, None, "Photosynthesis", false), "[[Photosynthesis]]");
        assert_eq!(
            links.build(&target, None, "photosynthesis", false),
            "[[Photosynthesis|photosynthesis]]"
        );
        assert_eq!(
            links.build(&target, Some("Light reactions"), "Photosynthesis", false),
            "[[Photosynthesis#Light reactions|Photosynthesis]]"
        );
    }

    #[test]
    fn test_shortest_falls_back_to_path_when_ambiguous() {
        let index = index();
        let links = LinkBuilder::new(&index, LinkStyle::Wiki, LinkFormat::Shortest);
        assert_eq!(
            links.build(&TargetId::new("Biology/Cell.md"), None, "Cell", false),
            "[[Biology/Cell|Cell]]"
        );
    }

    #[test]
    fn test_relative_and_absolute() {
        let index = index();
        let target = TargetId::new("Chemistry/Organic/Glucose.md");

        let relative = LinkBuilder::new(&index, LinkStyle::Wiki, LinkFormat::Relative)
            .for_source("Biology/Notes/Leaf.md");
        assert_eq!(relative.path_for(&target), "../../Chemistry/Organic/Glucose");

        let same_dir = LinkBuilder::new(&index, LinkStyle::Wiki, LinkFormat::Relative)
            .for_source("Chemistry/Organic/Sugars.md");
        assert_eq!(same_dir.path_for(&target), "./Glucose");

        let below = LinkBuilder::new(&index, LinkStyle::Wiki, LinkFormat::Relative)
            .for_source("Root.md");
        assert_eq!(below.path_for(&target), "./Chemistry/Organic/Glucose");

        let absolute = LinkBuilder::new(&index, LinkStyle::Wiki, LinkFormat::Absolute);
        assert_eq!(absolute.path_for(&target), "Chemistry/Organic/Glucose");
    }

    #[test]
    fn test_markdown_style() {
        let index = index();
        let links = LinkBuilder::new(&index, LinkStyle::Markdown, LinkFormat::Shortest);
        let target = TargetId::new("Biology/Photosynthesis.md");
        assert_eq!(
            links.build(&target, None, "Photosynthesis", false),
            "[Photosynthesis](Photosynthesis)"
        );
        assert_eq!(
            links.build(&target, Some("Light reactions"), "light", false),
            "[light](Photosynthesis#Light%20reactions)"
        );
    }

    #[test]
    fn test_table_escaping() {
        let index = index();
        let target = TargetId::new("Chemistry/Organic/Glucose.md");

        let wiki = LinkBuilder::new(&index, LinkStyle::Wiki, LinkFormat::Shortest);
        assert_eq!(wiki.build(&target, None, "glucose", true), "[[Glucose\\|glucose]]");
        assert_eq!(wiki.build(&target, None, "a|b", true), "[[Glucose\\|a\\|b]]");

        let markdown = LinkBuilder::new(&index, LinkStyle::Markdown, LinkFormat::Shortest);
        assert_eq!(markdown.build(&target, None, "a|b", true), "[a\\|b](Glucose)");
    }
}
