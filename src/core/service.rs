//! Process-scoped linker service.
//!
//! Owns the settings, the current vocabulary and the annotation cache, and
//! exposes the command interface. Constructed once at startup and passed to
//! every consumer.

use std::convert::Infallible;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::LinkerSettings;
use crate::convert::LinkConversionResolver;
use crate::domain::{
    AnnotationSet, Conversion, ConversionError, ConversionRequest, TargetId, TargetMeta,
};
use crate::scanner::{MatchScanner, ScanPolicy};
use crate::surface::{linked_targets, protected_ranges, DocumentSurface};
use crate::vault::MetadataProvider;
use crate::vocabulary::{DirectoryPattern, VocabularyIndex};

use super::cache::DocumentAnnotationCache;

/// A user action against the linker
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Persist one virtual link
    Convert(ConversionRequest),
    /// Persist every virtual link inside `[from, to)`
    ConvertSelection { from: usize, to: usize },
    /// Never link this keyword again
    ExcludeKeyword(String),
    SetActivated(bool),
    ToggleActivation,
    /// Tag a file so it is no longer a link target
    ExcludeFile(TargetId),
    /// Tag a file so it is always a link target
    IncludeFile(TargetId),
}

/// What a command did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Converted {
        conversions: Vec<Conversion>,
        failed: usize,
    },
    KeywordExcluded {
        keyword: String,
        added: bool,
    },
    Activation {
        active: bool,
    },
    FileRetagged {
        target: TargetId,
        tag: String,
    },
}

/// Command failures
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("No virtual links in {from}..{to}")]
    NothingSelected { from: usize, to: usize },

    #[error("Command needs an open document")]
    NeedsDocument,

    #[error("Unknown file: {0}")]
    UnknownTarget(TargetId),

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

/// Settings plus everything derived from them, swapped as a unit
struct State {
    settings: LinkerSettings,
    targets: Vec<TargetMeta>,
    vocabulary: Arc<VocabularyIndex>,
    no_linking: DirectoryPattern,
}

impl State {
    fn policy_for<D>(&self, doc: &D) -> ScanPolicy
    where
        D: DocumentSurface + ?Sized,
    {
        let settings = &self.settings;
        let text = doc.text();

        let mut policy = ScanPolicy::from_settings(settings).with_protected(protected_ranges(text));

        if settings.exclude_links_to_own_note {
            policy.exclude_target(TargetId::new(doc.id().as_str()));
        }
        if settings.exclude_links_to_real_linked_files {
            for link in linked_targets(text) {
                if let Some(target) = self.vocabulary.resolve_link_text(&link) {
                    policy.exclude_target(target.clone());
                }
            }
        }
        if settings.exclude_links_in_current_line {
            if let Some(cursor) = doc.cursor() {
                policy.protect_line_at(text, cursor);
            }
        }
        policy
    }

    fn build(settings: LinkerSettings, targets: Vec<TargetMeta>) -> Self {
        let vocabulary = VocabularyIndex::build(&targets, &settings);
        let no_linking = DirectoryPattern::compile(&settings.excluded_directories_for_linking);
        if let Some(error) = no_linking.error() {
            warn!(%error, "Linking exclusion pattern ignored");
        }
        info!(
            targets = targets.len(),
            included = vocabulary.included().count(),
            "Linker state rebuilt"
        );
        Self {
            settings,
            targets,
            vocabulary: Arc::new(vocabulary),
            no_linking,
        }
    }
}

/// The linker: vocabulary, annotation cache and commands
pub struct LinkerService {
    state: RwLock<State>,
    cache: Arc<DocumentAnnotationCache>,
    provider: Arc<dyn MetadataProvider>,
}

impl LinkerService {
    /// Load targets from `provider` and build the first vocabulary
    pub fn new(provider: Arc<dyn MetadataProvider>, settings: LinkerSettings) -> Result<Self> {
        let targets = provider.targets()?;
        Ok(Self {
            state: RwLock::new(State::build(settings, targets)),
            cache: Arc::new(DocumentAnnotationCache::new()),
            provider,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn settings(&self) -> LinkerSettings {
        self.read().settings.clone()
    }

    pub fn vocabulary(&self) -> Arc<VocabularyIndex> {
        self.read().vocabulary.clone()
    }

    pub fn cache(&self) -> &Arc<DocumentAnnotationCache> {
        &self.cache
    }

    pub fn is_active(&self) -> bool {
        self.read().settings.linker_activated
    }

    /// Re-read targets from the provider, rebuild the vocabulary and invalidate
    pub fn reload(&self) -> Result<()> {
        let targets = self.provider.targets()?;
        {
            let mut state = self.write();
            let settings = state.settings.clone();
            *state = State::build(settings, targets);
        }
        self.cache.invalidate_all();
        Ok(())
    }

    /// Change settings, rebuild the vocabulary and invalidate unconditionally
    pub fn update_settings<F, T>(&self, change: F) -> T
    where
        F: FnOnce(&mut LinkerSettings) -> T,
    {
        let result = {
            let mut state = self.write();
            let mut settings = state.settings.clone();
            let result = change(&mut settings);
            let targets = std::mem::take(&mut state.targets);
            *state = State::build(settings, targets);
            result
        };
        self.cache.invalidate_all();
        result
    }

    /// Scan policy for a document: settings, markdown protected regions,
    /// self and already-linked targets, and the cursor line if configured
    pub fn policy_for<D>(&self, doc: &D) -> ScanPolicy
    where
        D: DocumentSurface + ?Sized,
    {
        self.read().policy_for(doc)
    }

    /// Annotation set for the document's current version
    pub fn annotations<D>(&self, doc: &D) -> Arc<AnnotationSet>
    where
        D: DocumentSurface + ?Sized,
    {
        // Policy, vocabulary and generation come from one snapshot so a set
        // computed from replaced state is never cached as current.
        let snapshot = {
            let state = self.read();
            let generation = self.cache.generation();
            if !state.settings.linker_activated || state.no_linking.matches(doc.id().as_str()) {
                None
            } else {
                Some((state.policy_for(doc), state.vocabulary.clone(), generation))
            }
        };
        let Some((policy, vocabulary, generation)) = snapshot else {
            debug!(document = %doc.id(), "Document not scanned");
            return Arc::new(AnnotationSet::empty(doc.id().clone(), doc.version()));
        };

        self.cache
            .get_or_compute_at(doc.id(), doc.version(), generation, || {
                Ok::<_, Infallible>(MatchScanner::new(&vocabulary, &policy).scan(doc.text()))
            })
    }

    /// Run a command that needs no document
    #[instrument(skip(self))]
    pub fn apply(&self, command: Command) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::Convert(_) | Command::ConvertSelection { .. } => {
                Err(CommandError::NeedsDocument)
            }
            Command::ExcludeKeyword(keyword) => {
                let added = self.update_settings(|s| s.exclude_keyword(&keyword));
                info!(keyword = %keyword, added, "Keyword excluded");
                Ok(CommandOutcome::KeywordExcluded { keyword, added })
            }
            Command::SetActivated(active) => {
                self.update_settings(|s| s.linker_activated = active);
                info!(active, "Linker activation changed");
                Ok(CommandOutcome::Activation { active })
            }
            Command::ToggleActivation => {
                let active = self.update_settings(|s| {
                    s.linker_activated = !s.linker_activated;
                    s.linker_activated
                });
                info!(active, "Linker activation toggled");
                Ok(CommandOutcome::Activation { active })
            }
            Command::ExcludeFile(target) => self.retag(target, true),
            Command::IncludeFile(target) => self.retag(target, false),
        }
    }

    /// Run a command against an open document
    #[instrument(skip(self, doc), fields(document = %doc.id()))]
    pub fn execute<D>(&self, doc: &mut D, command: Command) -> Result<CommandOutcome, CommandError>
    where
        D: DocumentSurface + ?Sized,
    {
        let requests = match command {
            Command::Convert(request) => vec![request],
            Command::ConvertSelection { from, to } => {
                let annotations = self.annotations(&*doc);
                let requests: Vec<ConversionRequest> = annotations
                    .within(from, to)
                    .filter_map(|span| span.conversion_request(0))
                    .collect();
                if requests.is_empty() {
                    return Err(CommandError::NothingSelected { from, to });
                }
                requests
            }
            other => return self.apply(other),
        };

        let (settings, vocabulary) = {
            let state = self.read();
            (state.settings.clone(), state.vocabulary.clone())
        };
        let resolver =
            LinkConversionResolver::from_settings(&vocabulary, &settings).for_document(doc.id());

        let outcome = if let [request] = requests.as_slice() {
            let conversion = resolver.convert(doc, request)?;
            CommandOutcome::Converted {
                conversions: vec![conversion],
                failed: 0,
            }
        } else {
            let results = resolver.convert_batch(doc, &requests);
            let failed = results.iter().filter(|r| r.is_err()).count();
            let mut conversions: Vec<Conversion> = results.into_iter().filter_map(Result::ok).collect();
            conversions.sort_by_key(|c| c.new_start);
            CommandOutcome::Converted {
                conversions,
                failed,
            }
        };

        self.cache.invalidate_all();
        Ok(outcome)
    }

    fn retag(&self, target: TargetId, exclude: bool) -> Result<CommandOutcome, CommandError> {
        let (add, remove) = {
            let state = self.read();
            if !state.targets.iter().any(|t| t.id == target) {
                return Err(CommandError::UnknownTarget(target));
            }
            let (exclude_tag, include_tag) = (
                state.settings.tag_to_exclude_file.clone(),
                state.settings.tag_to_include_file.clone(),
            );
            if exclude {
                (exclude_tag, include_tag)
            } else {
                (include_tag, exclude_tag)
            }
        };

        self.provider.retag(&target, &add, &remove)?;
        self.reload()?;
        info!(%target, tag = %add, "File retagged");
        Ok(CommandOutcome::FileRetagged { target, tag: add })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::InMemoryDocument;
    use crate::vault::MemoryProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service(settings: LinkerSettings) -> LinkerService {
        let provider = MemoryProvider::new(vec![
            TargetMeta::new("Biology/Photosynthesis.md").with_aliases(["PS"]),
            TargetMeta::new("Biology/Cell.md"),
            TargetMeta::new("Chemistry/Glucose.md"),
        ]);
        LinkerService::new(Arc::new(provider), settings).unwrap()
    }

    fn sources(set: &AnnotationSet) -> Vec<&str> {
        set.spans.iter().map(|s| s.source_text.as_str()).collect()
    }

    #[test]
    fn test_annotations_are_cached_per_version() {
        let service = service(LinkerSettings::default());
        let doc = InMemoryDocument::new("Notes/Day.md", "Photosynthesis makes Glucose.");

        let first = service.annotations(&doc);
        let second = service.annotations(&doc);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sources(&first), vec!["Photosynthesis", "Glucose"]);
    }

    #[test]
    fn test_own_note_and_real_links_are_excluded() {
        let service = service(LinkerSettings::default());
        let doc = InMemoryDocument::new(
            "Biology/Cell.md",
            "A Cell uses [[Glucose]] and Glucose for Photosynthesis.",
        );
        let set = service.annotations(&doc);
        assert_eq!(sources(&set), vec!["Photosynthesis"]);
    }

    #[test]
    fn test_current_line_protection() {
        let mut settings = LinkerSettings::default();
        settings.exclude_links_in_current_line = true;
        let service = service(settings);
        let doc = InMemoryDocument::new("Day.md", "Cell\nGlucose").with_cursor(2);
        assert_eq!(sources(&service.annotations(&doc)), vec!["Glucose"]);
    }

    #[test]
    fn test_cursor_inside_multibyte_char() {
        let mut settings = LinkerSettings::default();
        settings.exclude_links_in_current_line = true;
        let service = service(settings);

        let doc = InMemoryDocument::new("Day.md", "Zoë Cell\nGlucose").with_cursor(3);
        assert_eq!(sources(&service.annotations(&doc)), vec!["Glucose"]);
    }

    #[test]
    fn test_deactivated_and_excluded_directories_yield_nothing() {
        let mut settings = LinkerSettings::default();
        settings.excluded_directories_for_linking = vec!["Archive".to_string()];
        let service = service(settings);

        let archived = InMemoryDocument::new("Archive/Old.md", "Cell");
        assert!(service.annotations(&archived).is_empty());

        let doc = InMemoryDocument::new("Day.md", "Cell");
        assert!(!service.annotations(&doc).is_empty());

        let outcome = service.apply(Command::ToggleActivation).unwrap();
        assert_eq!(outcome, CommandOutcome::Activation { active: false });
        assert!(service.annotations(&doc).is_empty());
    }

    #[test]
    fn test_exclude_keyword_invalidates() {
        let service = service(LinkerSettings::default());
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        service.cache().on_invalidate(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let doc = InMemoryDocument::new("Day.md", "PS and Cell");
        assert_eq!(sources(&service.annotations(&doc)), vec!["PS", "Cell"]);

        let outcome = service.apply(Command::ExcludeKeyword("ps".to_string())).unwrap();
        assert!(matches!(outcome, CommandOutcome::KeywordExcluded { added: true, .. }));
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(sources(&service.annotations(&doc)), vec!["Cell"]);
    }

    #[test]
    fn test_convert_selection() {
        let service = service(LinkerSettings::default());
        let mut doc = InMemoryDocument::new("Day.md", "Cell needs Glucose and PS.");

        let len = doc.text().len();
        let outcome = service
            .execute(&mut doc, Command::ConvertSelection { from: 0, to: len })
            .unwrap();
        match outcome {
            CommandOutcome::Converted { conversions, failed } => {
                assert_eq!(conversions.len(), 3);
                assert_eq!(failed, 0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            doc.text(),
            "[[Cell]] needs [[Glucose]] and [[Photosynthesis|PS]]."
        );
        assert!(service.annotations(&doc).is_empty());

        assert!(matches!(
            service.execute(&mut doc, Command::ConvertSelection { from: 0, to: 3 }),
            Err(CommandError::NothingSelected { .. })
        ));
    }

    #[test]
    fn test_convert_refuses_stale_request() {
        let service = service(LinkerSettings::default());
        let mut doc = InMemoryDocument::new("Day.md", "Some Cell");
        let request = ConversionRequest {
            start: 0,
            end: 4,
            origin_text: "Cell".to_string(),
            target: TargetId::new("Biology/Cell.md"),
            header_anchor: None,
            cell: None,
        };
        assert!(matches!(
            service.execute(&mut doc, Command::Convert(request)),
            Err(CommandError::Conversion(ConversionError::TextMismatch { .. }))
        ));
        assert_eq!(doc.text(), "Some Cell");
    }

    #[test]
    fn test_exclude_and_include_file() {
        let service = service(LinkerSettings::default());
        let doc = InMemoryDocument::new("Day.md", "Cell and Glucose");
        let glucose = TargetId::new("Chemistry/Glucose.md");

        service.apply(Command::ExcludeFile(glucose.clone())).unwrap();
        assert_eq!(sources(&service.annotations(&doc)), vec!["Cell"]);

        service.apply(Command::IncludeFile(glucose)).unwrap();
        assert_eq!(sources(&service.annotations(&doc)), vec!["Cell", "Glucose"]);

        assert!(matches!(
            service.apply(Command::ExcludeFile(TargetId::new("Nope.md"))),
            Err(CommandError::UnknownTarget(_))
        ));
    }
}
