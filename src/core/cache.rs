//! Process-wide cache of annotation sets, one current entry per document.
//!
//! Each `(document, version)` pair gets a slot; the first caller fills it and
//! concurrent callers for the same pair block on the slot instead of
//! scanning again. `invalidate_all` drops every slot and notifies
//! subscribers synchronously. A computation that was in flight during an
//! invalidation still returns its result to its callers, but that result
//! lives in a detached slot and never becomes current.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, warn};

use crate::domain::{AnnotationSet, DocumentId, DocumentVersion, MatchSpan};

type Slot = Arc<OnceLock<Arc<AnnotationSet>>>;

/// Callback run on every invalidation
pub type Subscriber = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`DocumentAnnotationCache::on_invalidate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct CurrentEntry {
    version: DocumentVersion,
    slot: Slot,
}

/// Cache of computed span sets; single source of truth for renderers
pub struct DocumentAnnotationCache {
    entries: Mutex<HashMap<DocumentId, CurrentEntry>>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
    generation: AtomicU64,
}

impl Default for DocumentAnnotationCache {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DocumentAnnotationCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            generation: AtomicU64::new(0),
        }
    }

    /// Return the cached set for `(document, version)`, computing it at most once.
    ///
    /// A newer version replaces the document's current entry. A version older
    /// than the current one is computed but not cached. A failed computation
    /// is recorded as an empty set for that version.
    pub fn get_or_compute<F, E>(
        &self,
        document: &DocumentId,
        version: DocumentVersion,
        compute: F,
    ) -> Arc<AnnotationSet>
    where
        F: FnOnce() -> Result<Vec<MatchSpan>, E>,
        E: Display,
    {
        self.get_or_compute_at(document, version, self.generation(), compute)
    }

    /// Like [`get_or_compute`](Self::get_or_compute), for a computation whose
    /// inputs were captured at `generation`.
    ///
    /// If the cache has been invalidated since then, the inputs are
    /// superseded: the set is computed for the caller but never cached.
    pub fn get_or_compute_at<F, E>(
        &self,
        document: &DocumentId,
        version: DocumentVersion,
        generation: u64,
        compute: F,
    ) -> Arc<AnnotationSet>
    where
        F: FnOnce() -> Result<Vec<MatchSpan>, E>,
        E: Display,
    {
        let slot = {
            let mut entries = lock(&self.entries);
            if self.generation.load(Ordering::SeqCst) != generation {
                None
            } else {
                match entries.get(document) {
                    Some(entry) if entry.version == version => Some(entry.slot.clone()),
                    Some(entry) if entry.version > version => None,
                    _ => {
                        let slot: Slot = Arc::new(OnceLock::new());
                        entries.insert(
                            document.clone(),
                            CurrentEntry {
                                version,
                                slot: slot.clone(),
                            },
                        );
                        Some(slot)
                    }
                }
            }
        };

        match slot {
            Some(slot) => slot
                .get_or_init(|| Arc::new(run_compute(document, version, compute)))
                .clone(),
            None => {
                debug!(%document, %version, generation, "Superseded request; not caching");
                Arc::new(run_compute(document, version, compute))
            }
        }
    }

    /// Cached set for `document`, if its current version has been computed
    pub fn get(&self, document: &DocumentId) -> Option<Arc<AnnotationSet>> {
        let entries = lock(&self.entries);
        entries
            .get(document)
            .and_then(|entry| entry.slot.get().cloned())
    }

    /// Version of the document's current entry
    pub fn current_version(&self, document: &DocumentId) -> Option<DocumentVersion> {
        lock(&self.entries).get(document).map(|entry| entry.version)
    }

    /// Number of documents with a current entry
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop one document's entry (e.g. when it is closed)
    pub fn evict(&self, document: &DocumentId) {
        lock(&self.entries).remove(document);
    }

    /// Number of invalidations so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Clear every entry and notify all subscribers before returning
    pub fn invalidate_all(&self) {
        let (dropped, generation) = {
            let mut entries = lock(&self.entries);
            let dropped = entries.len();
            entries.clear();
            (dropped, self.generation.fetch_add(1, Ordering::SeqCst) + 1)
        };

        let subscribers: Vec<Subscriber> = lock(&self.subscribers)
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();

        debug!(
            dropped,
            generation,
            subscribers = subscribers.len(),
            "Annotation cache invalidated"
        );

        for subscriber in subscribers {
            subscriber();
        }
    }

    /// Register a callback run on every invalidation
    pub fn on_invalidate<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        lock(&self.subscribers).push((id, Arc::new(subscriber)));
        id
    }

    /// Remove a callback; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }
}

fn run_compute<F, E>(document: &DocumentId, version: DocumentVersion, compute: F) -> AnnotationSet
where
    F: FnOnce() -> Result<Vec<MatchSpan>, E>,
    E: Display,
{
    match compute() {
        Ok(spans) => AnnotationSet::new(document.clone(), version, spans),
        Err(e) => {
            warn!(%document, %version, error = %e, "Annotation computation failed; caching empty set");
            AnnotationSet::empty(document.clone(), version)
        }
    }
}
