//! Configuration for vlinker.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VLINKER_VAULT)
//! 2. Config file (.vlinker/config.yaml)
//! 3. Defaults (vault = current directory, default settings)
//!
//! Config file discovery:
//! - Searches current directory and parents for .vlinker/config.yaml
//! - The vault path in the config file is relative to the directory holding .vlinker/

pub mod settings;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

pub use settings::LinkerSettings;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    /// Vault root (relative to the project directory)
    #[serde(default)]
    pub vault: Option<String>,
    #[serde(default)]
    pub settings: LinkerSettings,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the vault root
    pub vault: PathBuf,
    /// Linker settings
    pub settings: LinkerSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".vlinker").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project directory or start with `~/`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    let config_file = find_config_file();

    let (vault, settings) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        // Base directory is the parent of .vlinker/ (i.e., grandparent of config.yaml)
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));

        let vault = if let Ok(env_vault) = std::env::var("VLINKER_VAULT") {
            resolve_path(&cwd, &env_vault)
        } else if let Some(ref vault_path) = config.vault {
            resolve_path(base_dir, vault_path)
        } else {
            base_dir.to_path_buf()
        };

        (vault, config.settings)
    } else {
        let vault = std::env::var("VLINKER_VAULT")
            .map(|v| resolve_path(&cwd, &v))
            .unwrap_or(cwd);

        (vault, LinkerSettings::default())
    };

    Ok(ResolvedConfig {
        vault,
        settings,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(".vlinker");
        std::fs::create_dir_all(&config_dir).unwrap();

        let config_path = config_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
vault: ./notes
settings:
  only_link_once: false
  linker_directories: [Glossary, Terms]
  use_markdown_links: true
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.vault, Some("./notes".to_string()));
        assert!(!config.settings.only_link_once);
        assert!(config.settings.use_markdown_links);
        assert_eq!(config.settings.linker_directories, vec!["Glossary", "Terms"]);
        assert!(config.settings.include_headers);
    }

    #[test]
    fn test_config_file_without_settings() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        std::fs::write(&config_path, "version: \"1.0\"\n").unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert!(config.vault.is_none());
        assert_eq!(config.settings, LinkerSettings::default());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./vault"),
            PathBuf::from("/home/user/project/vault")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/vault"),
            PathBuf::from("/absolute/vault")
        );
    }
}
