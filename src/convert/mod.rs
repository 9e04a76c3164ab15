//! Conversion of virtual links into real links.
//!
//! - Table: row tokenizer and cell helpers
//! - Similarity: fuzzy cell scoring and its acceptance threshold
//! - Link: replacement text per link style and path format
//! - Resolver: verify-before-mutate resolution, single and batch

pub mod link;
pub mod resolver;
pub mod similarity;
pub mod table;

pub use link::LinkBuilder;
pub use resolver::LinkConversionResolver;
pub use similarity::{longest_common_subsequence, similarity, SIMILARITY_THRESHOLD};
pub use table::{clean_cell, escape_cell_text, is_table_row, split_row};
