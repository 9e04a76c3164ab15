//! Link targets as supplied by the metadata provider.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identity of a link target: its vault-relative path with `/` separators
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    /// Create a target ID from a vault-relative path
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into().replace('\\', "/"))
    }

    /// Get the raw path
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name including extension
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Parent directory ("" for files at the vault root)
    pub fn dir(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Path as written inside a link: the `.md` extension is dropped,
    /// other extensions are kept.
    pub fn link_path(&self) -> &str {
        self.0.strip_suffix(".md").unwrap_or(&self.0)
    }

    /// File name as written inside a link
    pub fn link_name(&self) -> &str {
        let name = self.file_name();
        name.strip_suffix(".md").unwrap_or(name)
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TargetId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Metadata for one candidate target, as enumerated by the metadata provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetMeta {
    /// Target identity (vault-relative path)
    pub id: TargetId,

    /// Display name (file name without extension)
    pub name: String,

    /// Aliases declared in frontmatter
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Heading texts in document order
    #[serde(default)]
    pub headings: Vec<String>,

    /// Tags without the leading `#`
    #[serde(default)]
    pub tags: Vec<String>,

    /// Raw frontmatter properties
    #[serde(default)]
    pub frontmatter: BTreeMap<String, serde_json::Value>,

    /// Vault-relative path (same as `id`, kept for pattern matching)
    pub path: String,
}

impl TargetMeta {
    /// Create metadata for a target with just a path; name derived from the file name
    pub fn new(path: &str) -> Self {
        let id = TargetId::new(path);
        let file_name = id.file_name();
        let name = match file_name.rfind('.') {
            Some(idx) if idx > 0 => file_name[..idx].to_string(),
            _ => file_name.to_string(),
        };
        Self {
            path: id.as_str().to_string(),
            id,
            name,
            ..Default::default()
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_headings<I, S>(mut self, headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headings = headings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_property(mut self, key: &str, value: serde_json::Value) -> Self {
        self.frontmatter.insert(key.to_string(), value);
        self
    }

    /// Whether the target carries `tag` (leading `#` ignored)
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim_start_matches('#');
        !tag.is_empty() && self.tags.iter().any(|t| t.trim_start_matches('#') == tag)
    }

    /// Whether a frontmatter property is set to a truthy value
    pub fn property_is_true(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        match self.frontmatter.get(key) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// Per-target case-sensitivity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseMode {
    /// Always compare exactly
    Sensitive,
    /// Always compare case-folded
    Insensitive,
    /// Decided per keyword by the uppercase heuristic, then the global default
    Auto,
}
