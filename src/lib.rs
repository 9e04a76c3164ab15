//! vlinker - Vocabulary-driven virtual links for markdown vaults
//!
//! Document text that matches a known vocabulary term (file names, aliases,
//! heading fragments) is annotated with non-persistent "virtual" links. Any
//! virtual link can later be upgraded into a real link written into the
//! document, after its position has been verified against the current text.
//!
//! # Architecture
//!
//! - Target metadata flows into an immutable `VocabularyIndex`
//! - `MatchScanner` turns (text, vocabulary, policy) into match spans
//! - `DocumentAnnotationCache` keeps one span set per document version
//! - `LinkConversionResolver` re-locates a recorded match (including inside
//!   distorted table rows) and builds the replacement link
//!
//! # Modules
//!
//! - `vocabulary`: Keyword index, directory patterns, case rules
//! - `scanner`: Match scanning and scan policy
//! - `core`: Annotation cache and the process-scoped `LinkerService`
//! - `convert`: Table tokenizer, similarity, link text, conversion
//! - `surface`: Document surface trait and markdown protected regions
//! - `vault`: Filesystem metadata provider and watcher
//! - `domain`: Data structures (targets, spans, conversion requests)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # List virtual links in a note
//! vlinker scan Notes/Today.md
//!
//! # Convert the virtual link at a byte offset
//! vlinker convert Notes/Today.md --at 120
//!
//! # Convert every virtual link in a note
//! vlinker convert-all Notes/Today.md
//! ```

pub mod cli;
pub mod config;
pub mod convert;
pub mod core;
pub mod domain;
pub mod scanner;
pub mod surface;
pub mod vault;
pub mod vocabulary;

// Re-export main types at crate root for convenience
pub use config::LinkerSettings;
pub use convert::{similarity, LinkBuilder, LinkConversionResolver};
pub use core::{Command, CommandError, CommandOutcome, DocumentAnnotationCache, LinkerService};
pub use domain::{
    AnnotationSet, Conversion, ConversionError, ConversionRequest, ConversionResult, DocumentId,
    DocumentVersion, MatchSpan, TargetId, TargetMeta,
};
pub use scanner::{scan, MatchScanner, ScanPolicy};
pub use surface::{DocumentSurface, InMemoryDocument, LineCol};
pub use vault::{MetadataProvider, VaultProvider, VaultWatcher};
pub use vocabulary::{VocabularyEntry, VocabularyIndex};
