//! Match spans and per-document annotation sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conversion::ConversionRequest;
use super::target::TargetId;

/// Where a matched keyword came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeywordKind {
    /// The target's own name
    Name,
    /// A frontmatter alias
    Alias,
    /// A fragment of a heading; `anchor` is the full heading text
    Heading { anchor: String },
}

/// One target a span may link to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub target: TargetId,
    #[serde(flatten)]
    pub kind: KeywordKind,
}

impl LinkCandidate {
    /// Header anchor for heading-fragment candidates
    pub fn header_anchor(&self) -> Option<&str> {
        match &self.kind {
            KeywordKind::Heading { anchor } => Some(anchor),
            _ => None,
        }
    }
}

/// One matched occurrence of a vocabulary keyword in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Literal matched text
    pub source_text: String,
    /// Targets in vocabulary order; more than one means an ambiguous reference
    pub candidates: Vec<LinkCandidate>,
    pub is_alias: bool,
    pub is_header_fragment: bool,
    /// Partial-word match (prefix, suffix or infix of a longer token)
    pub is_sub_word: bool,
}

impl MatchSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn has_multiple_references(&self) -> bool {
        self.candidates.len() > 1
    }

    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }

    /// Attribute tuple a renderer must round-trip for a later conversion
    pub fn conversion_request(&self, candidate: usize) -> Option<ConversionRequest> {
        let candidate = self.candidates.get(candidate)?;
        Some(ConversionRequest {
            start: self.start,
            end: self.end,
            origin_text: self.source_text.clone(),
            target: candidate.target.clone(),
            header_anchor: candidate.header_anchor().map(str::to_string),
            cell: None,
        })
    }
}

/// Document identity (vault-relative path of the open document)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing content version of an open document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentVersion(pub u64);

impl std::fmt::Display for DocumentVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// All spans computed for one `(document, version)` pair, sorted by `start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub document: DocumentId,
    pub version: DocumentVersion,
    pub spans: Vec<MatchSpan>,
    pub computed_at: DateTime<Utc>,
}

impl AnnotationSet {
    pub fn new(document: DocumentId, version: DocumentVersion, spans: Vec<MatchSpan>) -> Self {
        Self {
            document,
            version,
            spans,
            computed_at: Utc::now(),
        }
    }

    pub fn empty(document: DocumentId, version: DocumentVersion) -> Self {
        Self::new(document, version, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans lying entirely inside `[from, to)`
    pub fn within(&self, from: usize, to: usize) -> impl Iterator<Item = &MatchSpan> {
        self.spans
            .iter()
            .filter(move |span| span.start >= from && span.end <= to)
    }

    /// Span covering `offset`, if any
    pub fn at(&self, offset: usize) -> Option<&MatchSpan> {
        self.spans
            .iter()
            .find(|span| span.start <= offset && offset < span.end)
    }
}
