//! Filesystem vault: enumerates notes and files as link targets.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use fs2::FileExt;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::domain::{TargetId, TargetMeta};
use crate::surface::{fenced_code_ranges, frontmatter_range, DocumentSurface, InMemoryDocument};

use super::frontmatter;
use super::MetadataProvider;

static ATX_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}#{1,6}[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$").expect("valid regex"));
static INLINE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s(])#([\p{L}\p{N}_/\-]+)").expect("valid regex"));

/// Build target metadata for a markdown note
pub fn parse_note(path: &str, text: &str) -> TargetMeta {
    let mut meta = TargetMeta::new(path);

    let properties = match frontmatter::parse(text) {
        Ok(properties) => properties,
        Err(e) => {
            warn!(path, error = %e, "Ignoring unreadable frontmatter");
            BTreeMap::new()
        }
    };

    meta.aliases = frontmatter::string_list(&properties, &["aliases", "alias"]);
    let mut tags: Vec<String> = frontmatter::string_list(&properties, &["tags", "tag"])
        .into_iter()
        .map(|t| t.trim_start_matches('#').to_string())
        .collect();

    let mut skip = fenced_code_ranges(text);
    if let Some(range) = frontmatter_range(text) {
        skip.push(range);
    }

    let mut line_start = 0;
    for line in text.split('\n') {
        let line_end = line_start + line.len();
        let skipped = skip.iter().any(|&(s, e)| s <= line_start && line_start < e);
        if !skipped {
            let line = line.trim_end_matches('\r');
            if let Some(caps) = ATX_HEADING_RE.captures(line) {
                meta.headings.push(caps[1].trim().to_string());
            }
            for caps in INLINE_TAG_RE.captures_iter(line) {
                let tag = &caps[1];
                if !tag.chars().all(|c| c.is_ascii_digit()) && !tags.iter().any(|t| t == tag) {
                    tags.push(tag.to_string());
                }
            }
        }
        line_start = line_end + 1;
    }

    meta.tags = tags;
    meta.frontmatter = properties;
    meta
}

/// A vault rooted at a directory
#[derive(Debug, Clone)]
pub struct VaultProvider {
    root: PathBuf,
}

impl VaultProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Vault-relative `/`-separated path, or `None` if outside the vault
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    pub fn absolute_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Whether a vault-relative path lies under a hidden directory or is hidden
    pub fn is_hidden(relative: &str) -> bool {
        relative.split('/').any(|part| part.starts_with('.'))
    }

    /// Every visible file in the vault, sorted
    pub fn files(&self) -> Result<Vec<String>> {
        let root = self
            .root
            .to_str()
            .with_context(|| format!("Vault path is not valid UTF-8: {}", self.root.display()))?;
        let pattern = format!("{}/**/*", glob::Pattern::escape(root));

        let mut files = Vec::new();
        for entry in glob::glob(&pattern).context("Invalid vault glob pattern")? {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable vault entry");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            if let Some(rel) = self.relative_path(&path) {
                if !Self::is_hidden(&rel) {
                    files.push(rel);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Metadata for every file; notes are parsed, other files contribute a name
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load_targets(&self) -> Result<Vec<TargetMeta>> {
        let files = self.files()?;
        let mut targets = Vec::with_capacity(files.len());

        for rel in files {
            if rel.to_lowercase().ends_with(".md") {
                let text = std::fs::read_to_string(self.absolute_path(&rel))
                    .with_context(|| format!("Failed to read note: {}", rel))?;
                targets.push(parse_note(&rel, &text));
            } else {
                targets.push(TargetMeta::new(&rel));
            }
        }

        debug!(targets = targets.len(), "Vault loaded");
        Ok(targets)
    }

    /// Open a note as an in-memory document
    pub fn read_document(&self, relative: &str) -> Result<InMemoryDocument> {
        let path = self.absolute_path(relative);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        Ok(InMemoryDocument::new(relative, text))
    }

    /// Overwrite a note under an exclusive file lock
    pub fn write_document(&self, relative: &str, text: &str) -> Result<()> {
        let path = self.absolute_path(relative);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open document: {}", path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to acquire file lock on {}", path.display()))?;

        file.set_len(0).context("Failed to truncate document")?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("Failed to write document: {}", path.display()))?;
        file.flush().context("Failed to flush document")?;

        // Lock is released when file is dropped
        Ok(())
    }
}

impl MetadataProvider for VaultProvider {
    fn targets(&self) -> Result<Vec<TargetMeta>> {
        self.load_targets()
    }

    fn retag(&self, target: &TargetId, add: &str, remove: &str) -> Result<()> {
        let document = self.read_document(target.as_str())?;
        match frontmatter::retag(document.text(), add, remove)? {
            Some(updated) => {
                self.write_document(target.as_str(), &updated)?;
                info!(%target, add, remove, "Updated file tags");
            }
            None => debug!(%target, "File tags already up to date"),
        }
        Ok(())
    }
}
