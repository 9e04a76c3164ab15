//! YAML frontmatter: reading properties and editing the `tags` list.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value as YamlValue};

use crate::surface::frontmatter_range;

/// Split a note into its frontmatter YAML (without fences) and body
pub fn split(text: &str) -> (Option<&str>, &str) {
    match frontmatter_range(text) {
        Some((_, end)) => {
            let inner_start = text.find('\n').map_or(end, |i| i + 1);
            let inner_end = text[..end].rfind('\n').map_or(inner_start, |i| i + 1);
            let yaml = &text[inner_start..inner_end.max(inner_start)];
            let body_start = (end + 1).min(text.len());
            (Some(yaml), &text[body_start..])
        }
        None => (None, text),
    }
}

/// Parse frontmatter properties; a note without frontmatter has none
pub fn parse(text: &str) -> Result<BTreeMap<String, serde_json::Value>> {
    let (yaml, _) = split(text);
    let Some(yaml) = yaml.filter(|y| !y.trim().is_empty()) else {
        return Ok(BTreeMap::new());
    };

    let value: serde_json::Value =
        serde_yaml::from_str(yaml).context("Failed to parse frontmatter")?;
    Ok(match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    })
}

/// Read a string-or-list property, splitting strings on commas
pub fn string_list(
    properties: &BTreeMap<String, serde_json::Value>,
    keys: &[&str],
) -> Vec<String> {
    let mut out = Vec::new();
    for key in keys {
        match properties.get(*key) {
            Some(serde_json::Value::String(s)) => {
                out.extend(s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from));
            }
            Some(serde_json::Value::Array(items)) => {
                for item in items {
                    match item {
                        serde_json::Value::String(s) if !s.trim().is_empty() => {
                            out.push(s.trim().to_string())
                        }
                        serde_json::Value::Number(n) => out.push(n.to_string()),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Rewrite `text` so its frontmatter `tags` contains `add` and not `remove`.
///
/// Creates a frontmatter block when the note has none. Returns `None` when
/// nothing changes.
pub fn retag(text: &str, add: &str, remove: &str) -> Result<Option<String>> {
    let add = add.trim().trim_start_matches('#');
    let remove = remove.trim().trim_start_matches('#');

    let (yaml, body) = split(text);
    let mut mapping: Mapping = match yaml.filter(|y| !y.trim().is_empty()) {
        Some(yaml) => serde_yaml::from_str(yaml).context("Failed to parse frontmatter")?,
        None => Mapping::new(),
    };

    let key = ["tags", "tag"]
        .into_iter()
        .find(|k| mapping.contains_key(*k))
        .unwrap_or("tags");
    let mut tags: Vec<String> = match mapping.get(key) {
        Some(YamlValue::String(s)) => s
            .split(',')
            .map(|t| t.trim().trim_start_matches('#').to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Some(YamlValue::Sequence(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|t| t.trim().trim_start_matches('#').to_string())
            .collect(),
        _ => Vec::new(),
    };

    let before = tags.clone();
    if !remove.is_empty() {
        tags.retain(|t| t != remove);
    }
    if !add.is_empty() && !tags.iter().any(|t| t == add) {
        tags.push(add.to_string());
    }
    if tags == before {
        return Ok(None);
    }

    mapping.insert(
        YamlValue::String(key.to_string()),
        YamlValue::Sequence(tags.into_iter().map(YamlValue::String).collect()),
    );
    let yaml = serde_yaml::to_string(&mapping).context("Failed to serialize frontmatter")?;

    Ok(Some(format!("---\n{}---\n{}", yaml, body)))
}
