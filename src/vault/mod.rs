//! Vault access: target metadata, document IO and change watching.
//!
//! - Provider: walks a vault directory and parses notes into `TargetMeta`
//! - Frontmatter: YAML properties and tag editing
//! - Watcher: debounced recursive filesystem watcher

pub mod frontmatter;
pub mod provider;
pub mod watcher;

use std::sync::RwLock;

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

use crate::domain::{TargetId, TargetMeta};

pub use provider::{parse_note, VaultProvider};
pub use watcher::{VaultEvent, VaultWatcher, WatchHandle, WatcherConfig, WatcherError};

/// Source of link targets and their metadata
pub trait MetadataProvider: Send + Sync {
    /// Every target currently in the vault
    fn targets(&self) -> Result<Vec<TargetMeta>>;

    /// Add tag `add` to a target's frontmatter and remove tag `remove`
    fn retag(&self, target: &TargetId, add: &str, remove: &str) -> Result<()>;
}

/// SHA256 of content, first 12 hex chars
pub fn content_hash(content: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(content.as_ref());
    hex::encode(digest)[..12].to_string()
}

/// Provider holding targets in memory
#[derive(Debug, Default)]
pub struct MemoryProvider {
    targets: RwLock<Vec<TargetMeta>>,
}

impl MemoryProvider {
    pub fn new(targets: Vec<TargetMeta>) -> Self {
        Self {
            targets: RwLock::new(targets),
        }
    }

    pub fn set_targets(&self, targets: Vec<TargetMeta>) {
        *self.targets.write().unwrap_or_else(|p| p.into_inner()) = targets;
    }
}

impl MetadataProvider for MemoryProvider {
    fn targets(&self) -> Result<Vec<TargetMeta>> {
        Ok(self.targets.read().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn retag(&self, target: &TargetId, add: &str, remove: &str) -> Result<()> {
        let mut targets = self.targets.write().unwrap_or_else(|p| p.into_inner());
        let Some(meta) = targets.iter_mut().find(|t| &t.id == target) else {
            bail!("Unknown target: {}", target);
        };

        meta.tags.retain(|t| t != remove);
        if !add.is_empty() && !meta.has_tag(add) {
            meta.tags.push(add.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        let hash = content_hash("Photosynthesis");
        assert_eq!(hash.len(), 12);
        assert_eq!(hash, content_hash(b"Photosynthesis"));
        assert_ne!(hash, content_hash("photosynthesis"));
    }

    #[test]
    fn test_memory_provider_retag() {
        let provider = MemoryProvider::new(vec![
            TargetMeta::new("Cell.md").with_tags(["linker-include"])
        ]);
        let id = TargetId::new("Cell.md");

        provider.retag(&id, "linker-exclude", "linker-include").unwrap();
        let targets = provider.targets().unwrap();
        assert_eq!(targets[0].tags, vec!["linker-exclude"]);

        assert!(provider.retag(&TargetId::new("Missing.md"), "x", "y").is_err());
    }
}
