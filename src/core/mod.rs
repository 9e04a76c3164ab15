//! Core runtime state.
//!
//! This module contains:
//! - Cache: per-document annotation sets with single-flight computation
//!   and an invalidation bus
//! - Service: the process-scoped linker and its command interface

pub mod cache;
pub mod service;

// Re-export commonly used types
pub use cache::{DocumentAnnotationCache, SubscriptionId};
pub use service::{Command, CommandError, CommandOutcome, LinkerService};
