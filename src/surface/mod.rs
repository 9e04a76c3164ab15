//! Document surface: what the linker needs from an open document.
//!
//! The surface supplies current text, an optional cursor, a mutation
//! primitive and an offset translator. `InMemoryDocument` is the plain
//! implementation used by the CLI and by tests.

pub mod markdown;

use serde::Serialize;
use thiserror::Error;

use crate::domain::{DocumentId, DocumentVersion};

pub use markdown::{fenced_code_ranges, frontmatter_range, linked_targets, protected_ranges};

/// Line and column position (1-indexed for editor compatibility)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCol {
    pub line: usize,
    pub col: usize,
}

/// Clamp `offset` to the text and move it back onto a char boundary
pub fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Convert byte offset to line/column position.
///
/// Column counts characters, not bytes.
pub fn offset_to_line_col(text: &str, offset: usize) -> LineCol {
    let offset = floor_char_boundary(text, offset);
    let prefix = &text[..offset];

    let line = prefix.matches('\n').count() + 1;
    let line_start = prefix.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = text[line_start..offset].chars().count() + 1;

    LineCol { line, col }
}

/// Byte range of the line holding `offset`, without its newline
pub fn line_bounds(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let bytes = text.as_bytes();
    let start = bytes[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    let end = bytes[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(text.len(), |i| offset + i);
    (start, end)
}

/// Errors from mutating a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("Range {from}..{to} is outside the document (length {len})")]
    OutOfRange { from: usize, to: usize, len: usize },

    #[error("Offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// An open document as seen by the linker
pub trait DocumentSurface {
    fn id(&self) -> &DocumentId;

    /// Current content version; bumped by every mutation
    fn version(&self) -> DocumentVersion;

    fn text(&self) -> &str;

    /// Cursor byte offset, if the surface has one
    fn cursor(&self) -> Option<usize> {
        None
    }

    /// Replace `[from, to)` with `replacement`
    fn replace_range(&mut self, replacement: &str, from: usize, to: usize)
        -> Result<(), SurfaceError>;

    fn offset_to_position(&self, offset: usize) -> LineCol {
        offset_to_line_col(self.text(), offset)
    }
}

/// Document held entirely in memory
#[derive(Debug, Clone)]
pub struct InMemoryDocument {
    id: DocumentId,
    version: DocumentVersion,
    text: String,
    cursor: Option<usize>,
}

impl InMemoryDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            version: DocumentVersion(1),
            text: text.into(),
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: usize) -> Self {
        self.cursor = Some(floor_char_boundary(&self.text, cursor));
        self
    }

    pub fn set_cursor(&mut self, cursor: Option<usize>) {
        self.cursor = cursor.map(|c| floor_char_boundary(&self.text, c));
    }

    /// Replace the whole text, bumping the version
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.version = DocumentVersion(self.version.0 + 1);
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl DocumentSurface for InMemoryDocument {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn version(&self) -> DocumentVersion {
        self.version
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    fn replace_range(
        &mut self,
        replacement: &str,
        from: usize,
        to: usize,
    ) -> Result<(), SurfaceError> {
        if from > to || to > self.text.len() {
            return Err(SurfaceError::OutOfRange {
                from,
                to,
                len: self.text.len(),
            });
        }
        for offset in [from, to] {
            if !self.text.is_char_boundary(offset) {
                return Err(SurfaceError::NotCharBoundary(offset));
            }
        }

        self.text.replace_range(from..to, replacement);
        self.version = DocumentVersion(self.version.0 + 1);

        // Keep the cursor on the same logical character
        if let Some(cursor) = self.cursor {
            if cursor >= to {
                self.cursor = Some(cursor - (to - from) + replacement.len());
            } else if cursor > from {
                self.cursor = Some(from);
            }
        }
        Ok(())
    }
}
