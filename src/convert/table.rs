//! Markdown table tokenizer.
//!
//! A `|` separates cells unless it sits inside a `[[...]]` link, where it
//! separates a link target from its label. Everything here works on a single
//! line; a wiki link spanning lines is not recognized as a link.

use std::sync::LazyLock;

use regex::Regex;

static ALIASED_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\]]*\|([^\]]*)\]\]").expect("valid regex"));
static BARE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]*)\]\]").expect("valid regex"));
static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]*)\*\*").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Whether `line` looks like a table row
pub fn is_table_row(line: &str) -> bool {
    line.trim().starts_with('|')
}

/// Split a row into raw cells.
///
/// The link state toggles on `[[` and clears on `]]`; brackets do not nest.
/// A leading and trailing `|` produce empty first and last cells.
pub fn split_row(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut cells = Vec::new();
    let mut cell_start = 0;
    let mut in_link = false;

    for i in 0..bytes.len() {
        let next = bytes.get(i + 1).copied();
        match bytes[i] {
            b'[' if next == Some(b'[') => in_link = true,
            b']' if in_link && next == Some(b']') => in_link = false,
            b'|' if !in_link => {
                cells.push(&line[cell_start..i]);
                cell_start = i + 1;
            }
            _ => {}
        }
    }
    cells.push(&line[cell_start..]);
    cells
}

/// Whether the `|` at byte `pipe` is enclosed in an open `[[`.
///
/// Scans backward: each `]]` raises the depth, each `[[` lowers it, and an
/// unmatched `[[` means the pipe is inside a link.
pub fn pipe_in_link(line: &str, pipe: usize) -> bool {
    let bytes = line.as_bytes();
    let mut depth: i32 = 0;
    let mut j = pipe.min(bytes.len());

    while j > 0 {
        j -= 1;
        if j == 0 {
            break;
        }
        if bytes[j] == b']' && bytes[j - 1] == b']' {
            depth += 1;
            j -= 1;
        } else if bytes[j] == b'[' && bytes[j - 1] == b'[' {
            depth -= 1;
            j -= 1;
            if depth < 0 {
                return true;
            }
        }
    }
    false
}

/// Byte offset of the first non-space character after the `md_index`-th
/// cell delimiter of `line`, skipping pipes inside links
pub fn cell_content_offset(line: &str, md_index: usize) -> Option<usize> {
    if md_index == 0 {
        return None;
    }

    let bytes = line.as_bytes();
    let mut pipes = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'|' || pipe_in_link(line, i) {
            continue;
        }
        pipes += 1;
        if pipes == md_index {
            let mut offset = i + 1;
            while offset < bytes.len() && bytes[offset] == b' ' {
                offset += 1;
            }
            return Some(offset);
        }
    }
    None
}

/// Reduce raw cell markdown to roughly what a renderer displays
pub fn clean_cell(cell: &str) -> String {
    let text = ALIASED_LINK_RE.replace_all(cell, "$1");
    let text = BARE_LINK_RE.replace_all(&text, "$1");
    let text = LINE_BREAK_RE.replace_all(&text, " ");
    let text = BOLD_RE.replace_all(&text, "$1");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Escape `\` and `|` so text can sit inside a table cell
pub fn escape_cell_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || c == '|' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Column of the cell holding byte `offset` of a table row, plus that
/// cell's cleaned text.
///
/// The column is 0-based among visible cells (the empty cell before the
/// leading `|` is not counted).
pub fn cell_at(line: &str, offset: usize) -> Option<(usize, String)> {
    if !is_table_row(line) || offset > line.len() {
        return None;
    }

    let bytes = line.as_bytes();
    let pipes_before = (0..offset)
        .filter(|&i| bytes[i] == b'|' && !pipe_in_link(line, i))
        .count();
    if pipes_before == 0 {
        return None;
    }

    let cells = split_row(line);
    let raw = cells.get(pipes_before)?;
    Some((pipes_before - 1, clean_cell(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_row_keeps_link_pipes() {
        assert_eq!(split_row("| [[A|B]] | C |"), vec!["", " [[A|B]] ", " C ", ""]);
        assert_eq!(split_row("a|b"), vec!["a", "b"]);
        assert_eq!(split_row("no pipes"), vec!["no pipes"]);
    }

    #[test]
    fn test_split_row_escaped_pipe_outside_link_separates() {
        assert_eq!(split_row(r"| a \| b |"), vec!["", r" a \", " b ", ""]);
        assert_eq!(split_row(r"| [[A\|B]] |"), vec!["", r" [[A\|B]] ", ""]);
    }

    #[test]
    fn test_pipe_in_link() {
        let line = "| [[A|B]] | C |";
        assert!(!pipe_in_link(line, 0));
        assert!(pipe_in_link(line, 5));
        assert!(!pipe_in_link(line, 10));
        // Closed link before the pipe
        assert!(!pipe_in_link("[[A]] | x", 6));
    }

    #[test]
    fn test_cell_content_offset() {
        let line = "| [[Sugar|sugars]] | Glucose production |";
        let offset = cell_content_offset(line, 2).unwrap();
        assert!(line[offset..].starts_with("Glucose"));
        assert_eq!(cell_content_offset(line, 1), Some(2));
        assert_eq!(cell_content_offset(line, 9), None);
    }

    #[test]
    fn test_clean_cell() {
        assert_eq!(clean_cell(" [[Sugar|sugars]] and [[Starch]] "), "sugars and Starch");
        assert_eq!(clean_cell("line<br>break<BR/>again"), "line break again");
        assert_eq!(clean_cell("**bold**   text"), "bold text");
    }

    #[test]
    fn test_escape_cell_text() {
        assert_eq!(escape_cell_text(r"a|b\c"), r"a\|b\\c");
        assert_eq!(escape_cell_text("plain"), "plain");
    }

    #[test]
    fn test_cell_at() {
        let line = "| Plant | [[Sugar|sugars]] | Glucose production |";
        let offset = line.find("Glucose").unwrap();
        assert_eq!(cell_at(line, offset), Some((2, "Glucose production".to_string())));
        assert_eq!(cell_at(line, 3), Some((0, "Plant".to_string())));
        assert!(cell_at("not | a row", 5).is_none());
    }
}
