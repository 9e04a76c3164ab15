//! Conversion request and result types.
//!
//! A conversion either yields verified offsets plus replacement text, or an
//! explicit failure. There is no partial result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::target::TargetId;

/// Rendered table cell that hosted a virtual link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellContext {
    /// 0-based column of the cell among the row's visible cells
    pub column: usize,
    /// Visible text of the rendered cell
    pub visible_text: String,
}

/// Attribute tuple recorded on a virtual link at scan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub start: usize,
    pub end: usize,
    pub origin_text: String,
    pub target: TargetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_anchor: Option<String>,
    /// Present when the renderer displayed the link inside a table cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<CellContext>,
}

impl ConversionRequest {
    pub fn with_cell(mut self, column: usize, visible_text: impl Into<String>) -> Self {
        self.cell = Some(CellContext {
            column,
            visible_text: visible_text.into(),
        });
        self
    }
}

/// How the final offsets were found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Recorded offsets still held the origin text
    Direct,
    /// Re-located through table column and cell similarity
    TableRow,
    /// First table-ish line containing the origin text
    LineFallback,
}

/// A verified conversion, ready to be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub new_start: usize,
    pub new_end: usize,
    pub replacement: String,
    pub method: ResolutionMethod,
}

/// Reasons a conversion is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Origin text is empty")]
    EmptyOrigin,

    #[error("Unknown link target: {0}")]
    UnknownTarget(TargetId),

    #[error("Text at {start}..{end} no longer matches '{origin}' and the link is not in a table")]
    TextMismatch {
        start: usize,
        end: usize,
        origin: String,
    },

    #[error("Rendered cell text does not contain '{0}'")]
    OriginNotInCell(String),

    #[error("No table row could be matched for '{0}'")]
    NoCandidateRow(String),

    #[error("Verification failed at {start}..{end}: expected '{expected}'")]
    VerificationFailed {
        start: usize,
        end: usize,
        expected: String,
    },

    #[error("Range {start}..{end} overlaps another conversion in the same batch")]
    Overlap { start: usize, end: usize },

    #[error("Document rejected the replacement: {0}")]
    ReplaceFailed(String),
}

/// Result of resolving one conversion request
pub type ConversionResult = Result<Conversion, ConversionError>;

/// Syntax of the persisted link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    /// `[[path|label]]`
    #[default]
    Wiki,
    /// `[label](path)`
    Markdown,
}

/// How the target path is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkFormat {
    #[default]
    Shortest,
    Relative,
    Absolute,
}
