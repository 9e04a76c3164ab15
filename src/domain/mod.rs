//! Domain types for vlinker.
//!
//! This module contains the core data structures:
//! - Targets: link destinations and their metadata
//! - Spans: matched keyword occurrences and per-document annotation sets
//! - Conversion: requests to persist a virtual link and their results

pub mod conversion;
pub mod span;
pub mod target;

// Re-export commonly used types
pub use conversion::{
    CellContext, Conversion, ConversionError, ConversionRequest, ConversionResult, LinkFormat,
    LinkStyle, ResolutionMethod,
};
pub use span::{AnnotationSet, DocumentId, DocumentVersion, KeywordKind, LinkCandidate, MatchSpan};
pub use target::{CaseMode, TargetId, TargetMeta};
