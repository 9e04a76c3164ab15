//! Vault file watcher.
//!
//! Watches the vault recursively and emits an event whenever a note's
//! content actually changes, is created or is removed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use super::{content_hash, VaultProvider};

/// Errors that can occur with the watcher
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Vault directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Vault root to watch
    pub root: PathBuf,

    /// Debounce window for filesystem events (milliseconds)
    pub debounce_ms: u64,

    /// File extensions that trigger an event; empty means every file
    pub extensions: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            debounce_ms: 500,
            extensions: Vec::new(),
        }
    }
}

impl WatcherConfig {
    pub fn for_vault(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Check if the vault root exists
    pub fn validate(&self) -> Result<(), WatcherError> {
        if !self.root.is_dir() {
            return Err(WatcherError::DirectoryNotFound(self.root.clone()));
        }
        Ok(())
    }

    fn wants(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Event emitted when a vault file changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultEvent {
    /// Vault-relative path
    pub path: String,

    /// Content hash (12 chars); `None` when the file was removed
    pub hash: Option<String>,

    /// When the change was detected
    pub detected_at: DateTime<Utc>,
}

impl VaultEvent {
    pub fn is_removal(&self) -> bool {
        self.hash.is_none()
    }
}

/// Recursive vault watcher
pub struct VaultWatcher {
    config: WatcherConfig,
}

impl VaultWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Watch the vault and emit events for changed files.
    /// Runs until stopped via the returned handle.
    pub async fn watch(&self) -> Result<(mpsc::Receiver<VaultEvent>, WatchHandle)> {
        self.config.validate()?;

        let (event_tx, event_rx) = mpsc::channel::<VaultEvent>(100);
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = run_watcher(config, event_tx, &mut stop_rx).await {
                tracing::error!("Watcher error: {}", e);
            }
        });

        Ok((
            event_rx,
            WatchHandle {
                stop_tx,
                task: handle,
            },
        ))
    }
}

/// Handle to control the watcher
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the watcher
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}

/// Internal watcher loop
async fn run_watcher(
    config: WatcherConfig,
    event_tx: mpsc::Sender<VaultEvent>,
    stop_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    // Events carry canonical paths
    let vault = VaultProvider::new(config.root.canonicalize()?);

    // Last seen content hash per vault-relative path
    let mut known: HashMap<String, String> = HashMap::new();

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(config.debounce_ms), tx)?;
    debouncer.watcher().watch(&config.root, RecursiveMode::Recursive)?;

    tracing::info!("Watching vault {}", config.root.display());

    loop {
        if stop_rx.try_recv().is_ok() {
            tracing::info!("Watcher stopping...");
            break;
        }

        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Ok(events)) => {
                for event in events {
                    let Some(rel) = vault.relative_path(&event.path) else {
                        continue;
                    };
                    if VaultProvider::is_hidden(&rel) || !config.wants(&event.path) {
                        continue;
                    }

                    if event.path.is_dir() {
                        continue;
                    }

                    let hash = match std::fs::read(&event.path) {
                        Ok(bytes) => Some(content_hash(&bytes)),
                        Err(_) if !event.path.exists() => None,
                        Err(e) => {
                            tracing::warn!("Failed to read {}: {}", event.path.display(), e);
                            continue;
                        }
                    };
                    let changed = match &hash {
                        Some(h) => known.insert(rel.clone(), h.clone()).as_ref() != Some(h),
                        None => {
                            known.remove(&rel);
                            true
                        }
                    };
                    if !changed {
                        tracing::debug!("Unchanged content: {}", rel);
                        continue;
                    }

                    tracing::debug!("Vault change: {}", rel);
                    let vault_event = VaultEvent {
                        path: rel,
                        hash,
                        detected_at: Utc::now(),
                    };
                    if event_tx.send(vault_event).await.is_err() {
                        tracing::debug!("Event receiver dropped; stopping watcher");
                        return Ok(());
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Watcher error: {:?}", e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("Watcher channel disconnected");
                break;
            }
        }

        // Small sleep to prevent busy loop
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    Ok(())
}
