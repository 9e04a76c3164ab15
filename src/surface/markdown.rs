//! Markdown regions the scanner must leave alone, and real links already
//! present in a document.

use std::sync::LazyLock;

use regex::Regex;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})").expect("valid regex"));
static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"``[^\n]*?``|`[^`\n]+`").expect("valid regex"));
static WIKI_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[\[([^\]\n]*)\]\]").expect("valid regex"));
static MARKDOWN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[[^\]\n]*\]\(([^)\n]*)\)").expect("valid regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?|ftp|file)://[^\s)>\]]+").expect("valid regex"));

/// Byte range of a leading `---` YAML block, including the closing line
pub fn frontmatter_range(text: &str) -> Option<(usize, usize)> {
    let first_end = text.find('\n')?;
    if text[..first_end].trim_end() != "---" {
        return None;
    }

    let mut line_start = first_end + 1;
    while line_start <= text.len() {
        let line_end = text[line_start..]
            .find('\n')
            .map_or(text.len(), |i| line_start + i);
        let line = text[line_start..line_end].trim_end();
        if line == "---" || line == "..." {
            return Some((0, line_end));
        }
        if line_end == text.len() {
            break;
        }
        line_start = line_end + 1;
    }
    None
}

/// Byte ranges of fenced code blocks; an unclosed fence runs to the end
pub fn fenced_code_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut open: Option<(usize, char, usize)> = None;
    let mut line_start = 0;

    for line in text.split('\n') {
        let line_end = line_start + line.len();
        if let Some(caps) = FENCE_RE.captures(line) {
            let fence = &caps[1];
            let marker = fence.chars().next().unwrap_or('`');
            let len = fence.len();
            match open {
                None => open = Some((line_start, marker, len)),
                Some((start, m, l)) if m == marker && len >= l && line.trim()[len..].trim().is_empty() => {
                    ranges.push((start, line_end));
                    open = None;
                }
                Some(_) => {}
            }
        }
        line_start = line_end + 1;
    }

    if let Some((start, _, _)) = open {
        ranges.push((start, text.len()));
    }
    ranges
}

fn inside(ranges: &[(usize, usize)], start: usize, end: usize) -> bool {
    ranges.iter().any(|&(s, e)| start < e && s < end)
}

/// Regions of a markdown document that must not carry virtual links:
/// frontmatter, fenced and inline code, wiki links and embeds, markdown
/// links and bare URLs. Sorted by start; may overlap.
pub fn protected_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    if let Some(range) = frontmatter_range(text) {
        ranges.push(range);
    }
    ranges.extend(fenced_code_ranges(text));

    let blocks = ranges.clone();
    for re in [&*INLINE_CODE_RE, &*WIKI_LINK_RE, &*MARKDOWN_LINK_RE, &*URL_RE] {
        for m in re.find_iter(text) {
            if !inside(&blocks, m.start(), m.end()) {
                ranges.push((m.start(), m.end()));
            }
        }
    }

    ranges.sort_unstable();
    ranges
}

/// Raw targets of real links in the document, outside code and frontmatter.
///
/// Wiki links yield their inner text (`Name#Heading|label` as written);
/// markdown links yield their destination with `%20` decoded. External
/// URLs are skipped.
pub fn linked_targets(text: &str) -> Vec<String> {
    let mut blocks: Vec<(usize, usize)> = fenced_code_ranges(text);
    if let Some(range) = frontmatter_range(text) {
        blocks.push(range);
    }
    blocks.extend(INLINE_CODE_RE.find_iter(text).map(|m| (m.start(), m.end())));

    let mut targets = Vec::new();
    for caps in WIKI_LINK_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if !inside(&blocks, whole.start(), whole.end()) {
            targets.push(inner.as_str().replace("\\|", "|"));
        }
    }
    for caps in MARKDOWN_LINK_RE.captures_iter(text) {
        let (Some(whole), Some(dest)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let dest = dest.as_str().trim().trim_start_matches('<').trim_end_matches('>');
        if dest.is_empty() || dest.contains("://") || dest.starts_with("mailto:") {
            continue;
        }
        if !inside(&blocks, whole.start(), whole.end()) {
            targets.push(dest.replace("%20", " "));
        }
    }
    targets
}
