//! `vlinker watch`: keep a note's virtual links current while the vault changes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::vault::{VaultWatcher, WatcherConfig};

use super::{document_path, open};

/// Watch the vault; rebuild the vocabulary and rescan `document` on change
pub async fn execute(vault: Option<PathBuf>, document: &str) -> Result<()> {
    let (provider, service) = open(vault)?;
    let rel = document_path(&provider, document)?;
    let mut doc = provider.read_document(&rel)?;

    // Subscribers only learn that annotations are stale
    let stale = Arc::new(AtomicBool::new(false));
    let flag = stale.clone();
    service.cache().on_invalidate(move || flag.store(true, Ordering::SeqCst));

    println!("👁️  Watching: {}", provider.root().display());
    println!("    Note: {}", rel);
    println!("    Press Ctrl+C to stop");
    println!();
    report(&rel, service.annotations(&doc).spans.len());

    let watcher = VaultWatcher::new(WatcherConfig::for_vault(provider.root()));
    let (mut event_rx, handle) = watcher.watch().await?;

    let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        let _ = stop_tx.send(());
    });

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                let verb = if event.is_removal() { "removed" } else { "changed" };
                println!("📥 {} {}", event.path, verb);

                if let Err(e) = service.reload() {
                    tracing::warn!("Failed to reload vault: {}", e);
                    continue;
                }
                if event.path == rel {
                    match provider.read_document(&rel) {
                        Ok(fresh) => doc.set_text(fresh.into_text()),
                        Err(e) => {
                            tracing::warn!("Failed to reread {}: {}", rel, e);
                            continue;
                        }
                    }
                }
                if stale.swap(false, Ordering::SeqCst) {
                    report(&rel, service.annotations(&doc).spans.len());
                }
            }
            _ = &mut stop_rx => {
                println!();
                println!("🛑 Stopping watcher...");
                handle.stop().await?;
                break;
            }
        }
    }

    Ok(())
}

fn report(rel: &str, links: usize) {
    println!("🔗 {}: {} virtual link(s)", rel, links);
}
