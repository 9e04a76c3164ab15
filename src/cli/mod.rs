//! Command-line interface for vlinker.
//!
//! Provides commands for scanning notes for virtual links, inspecting the
//! vocabulary, converting virtual links into real links, tagging files in
//! or out of the vocabulary, and watching the vault.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config;
use crate::core::{Command, CommandOutcome, LinkerService};
use crate::domain::{ConversionRequest, MatchSpan, TargetId};
use crate::surface::{DocumentSurface, InMemoryDocument};
use crate::vault::VaultProvider;

pub mod watch;

/// vlinker - Vocabulary-driven virtual links for markdown vaults
#[derive(Parser, Debug)]
#[command(name = "vlinker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Vault root (overrides the config file)
    #[arg(long, global = true, env = "VLINKER_VAULT")]
    pub vault: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the virtual links in a note
    Scan {
        /// Note path (vault-relative or on disk)
        document: String,

        /// Cursor byte offset (for current-line exclusion)
        #[arg(long)]
        cursor: Option<usize>,

        /// Print the annotation set as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the vocabulary built from the vault
    Vocab {
        /// Also list targets that are not eligible
        #[arg(short, long)]
        all: bool,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert one virtual link into a real link
    Convert {
        /// Note path (vault-relative or on disk)
        document: String,

        /// Byte offset inside the virtual link
        #[arg(long, conflicts_with = "request")]
        at: Option<usize>,

        /// Candidate to link to when the span is ambiguous
        #[arg(long, default_value = "0")]
        candidate: usize,

        /// Raw conversion request as JSON
        #[arg(long)]
        request: Option<String>,

        /// Resolve only; do not write the note
        #[arg(long)]
        dry_run: bool,
    },

    /// Convert every virtual link in a note (or a byte range of it)
    ConvertAll {
        /// Note path (vault-relative or on disk)
        document: String,

        #[arg(long)]
        from: Option<usize>,

        #[arg(long)]
        to: Option<usize>,

        /// Resolve only; do not write the note
        #[arg(long)]
        dry_run: bool,
    },

    /// Tag a file so it is never a link target
    ExcludeFile {
        /// File path (vault-relative or on disk)
        file: String,
    },

    /// Tag a file so it is always a link target
    IncludeFile {
        /// File path (vault-relative or on disk)
        file: String,
    },

    /// Watch the vault and rescan a note whenever the vault changes
    Watch {
        /// Note path (vault-relative or on disk)
        document: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let vault = self.vault;
        match self.command {
            Commands::Scan {
                document,
                cursor,
                json,
            } => scan(vault, &document, cursor, json),
            Commands::Vocab { all, json } => show_vocab(vault, all, json),
            Commands::Convert {
                document,
                at,
                candidate,
                request,
                dry_run,
            } => convert(vault, &document, at, candidate, request, dry_run),
            Commands::ConvertAll {
                document,
                from,
                to,
                dry_run,
            } => convert_all(vault, &document, from, to, dry_run),
            Commands::ExcludeFile { file } => retag(vault, &file, true),
            Commands::IncludeFile { file } => retag(vault, &file, false),
            Commands::Watch { document } => watch::execute(vault, &document).await,
            Commands::Config => show_config(vault),
        }
    }
}

/// Vault root from the flag, else from configuration
fn vault_root(vault: Option<PathBuf>) -> Result<PathBuf> {
    match vault {
        Some(path) => Ok(path),
        None => Ok(config::config()?.vault.clone()),
    }
}

/// Open the vault and build the linker over it
pub(crate) fn open(vault: Option<PathBuf>) -> Result<(Arc<VaultProvider>, LinkerService)> {
    let settings = config::config()?.settings.clone();
    let provider = Arc::new(VaultProvider::new(vault_root(vault)?));
    let service = LinkerService::new(provider.clone(), settings)
        .with_context(|| format!("Failed to load vault: {}", provider.root().display()))?;
    Ok((provider, service))
}

/// Vault-relative path for a note given on the command line
pub(crate) fn document_path(vault: &VaultProvider, arg: &str) -> Result<String> {
    let on_disk = Path::new(arg);
    if on_disk.exists() {
        let absolute = on_disk
            .canonicalize()
            .with_context(|| format!("Failed to resolve path: {}", arg))?;
        let root = vault
            .root()
            .canonicalize()
            .with_context(|| format!("Failed to resolve vault: {}", vault.root().display()))?;
        return VaultProvider::new(root)
            .relative_path(&absolute)
            .with_context(|| format!("{} is outside the vault", arg));
    }
    Ok(arg.trim_start_matches("./").to_string())
}

fn describe(doc: &InMemoryDocument, span: &MatchSpan) -> String {
    let at = doc.offset_to_position(span.start);
    let targets: Vec<String> = span
        .candidates
        .iter()
        .map(|c| match c.header_anchor() {
            Some(anchor) => format!("{}#{}", c.target, anchor),
            None => c.target.to_string(),
        })
        .collect();
    let mut flags = Vec::new();
    if span.is_alias {
        flags.push("alias");
    }
    if span.is_header_fragment {
        flags.push("heading");
    }
    if span.is_sub_word {
        flags.push("sub-word");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };
    format!(
        "{:>4}:{:<4} {:<24} → {}{}",
        at.line,
        at.col,
        span.source_text,
        targets.join(", "),
        flags
    )
}

fn scan(vault: Option<PathBuf>, document: &str, cursor: Option<usize>, json: bool) -> Result<()> {
    let (provider, service) = open(vault)?;
    let rel = document_path(&provider, document)?;
    let mut doc = provider.read_document(&rel)?;
    doc.set_cursor(cursor);

    let annotations = service.annotations(&doc);
    if json {
        println!("{}", serde_json::to_string_pretty(&*annotations)?);
        return Ok(());
    }

    println!("{} ({} virtual links)", rel, annotations.spans.len());
    println!("{}", "-".repeat(60));
    for span in &annotations.spans {
        println!("{}", describe(&doc, span));
    }
    Ok(())
}

fn show_vocab(vault: Option<PathBuf>, all: bool, json: bool) -> Result<()> {
    let (_, service) = open(vault)?;
    let vocabulary = service.vocabulary();

    let entries: Vec<_> = vocabulary
        .entries()
        .iter()
        .filter(|e| all || e.included)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!(
        "Vocabulary: {} targets, {} eligible",
        vocabulary.entries().len(),
        vocabulary.included().count()
    );
    println!("{}", "-".repeat(60));
    for entry in entries {
        let keywords: Vec<&str> = entry.keywords.iter().map(|k| k.text.as_str()).collect();
        let marker = if entry.included { " " } else { "✗" };
        println!("{} {:<40} {}", marker, entry.target.as_str(), keywords.join(", "));
    }

    if !vocabulary.config_errors().is_empty() {
        println!();
        println!("Configuration errors:");
        for error in vocabulary.config_errors() {
            println!("  ⚠️  {}", error);
        }
    }
    Ok(())
}

fn print_outcome(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Converted {
            conversions,
            failed,
        } => {
            for c in conversions {
                println!("✅ {}..{} → {}", c.new_start, c.new_end, c.replacement);
            }
            if *failed > 0 {
                println!("⚠️  {} link(s) could not be verified and were left alone", failed);
            }
        }
        CommandOutcome::KeywordExcluded { keyword, added } => {
            if *added {
                println!("✅ Excluded keyword '{}'", keyword);
            } else {
                println!("ℹ️  Keyword '{}' was already excluded", keyword);
            }
        }
        CommandOutcome::Activation { active } => {
            println!("Linker {}", if *active { "activated" } else { "deactivated" });
        }
        CommandOutcome::FileRetagged { target, tag } => {
            println!("✅ Tagged {} with #{}", target, tag);
        }
    }
}

fn convert(
    vault: Option<PathBuf>,
    document: &str,
    at: Option<usize>,
    candidate: usize,
    request: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let (provider, service) = open(vault)?;
    let rel = document_path(&provider, document)?;
    let mut doc = provider.read_document(&rel)?;

    let request: ConversionRequest = match (request, at) {
        (Some(json), _) => serde_json::from_str(&json).context("Invalid conversion request")?,
        (None, Some(offset)) => {
            let annotations = service.annotations(&doc);
            let span = annotations
                .at(offset)
                .with_context(|| format!("No virtual link at offset {}", offset))?;
            span.conversion_request(candidate).with_context(|| {
                format!(
                    "Candidate {} out of range ({} available)",
                    candidate,
                    span.candidates.len()
                )
            })?
        }
        (None, None) => anyhow::bail!("Pass --at <offset> or --request <json>"),
    };

    if dry_run {
        let vocabulary = service.vocabulary();
        let settings = service.settings();
        let resolver = crate::convert::LinkConversionResolver::from_settings(&vocabulary, &settings)
            .for_document(doc.id());
        let conversion = resolver.resolve(doc.text(), &request)?;
        println!("{}", serde_json::to_string_pretty(&conversion)?);
        return Ok(());
    }

    let outcome = service.execute(&mut doc, Command::Convert(request))?;
    provider.write_document(&rel, doc.text())?;
    print_outcome(&outcome);
    Ok(())
}

fn convert_all(
    vault: Option<PathBuf>,
    document: &str,
    from: Option<usize>,
    to: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let (provider, service) = open(vault)?;
    let rel = document_path(&provider, document)?;
    let mut doc = provider.read_document(&rel)?;
    let from = from.unwrap_or(0);
    let to = to.unwrap_or(doc.text().len());

    if dry_run {
        let annotations = service.annotations(&doc);
        for span in annotations.within(from, to) {
            println!("{}", describe(&doc, span));
        }
        return Ok(());
    }

    let outcome = service.execute(&mut doc, Command::ConvertSelection { from, to })?;
    provider.write_document(&rel, doc.text())?;
    print_outcome(&outcome);
    Ok(())
}

fn retag(vault: Option<PathBuf>, file: &str, exclude: bool) -> Result<()> {
    let (provider, service) = open(vault)?;
    let target = TargetId::new(document_path(&provider, file)?);
    let command = if exclude {
        Command::ExcludeFile(target)
    } else {
        Command::IncludeFile(target)
    };
    let outcome = service.apply(command)?;
    print_outcome(&outcome);
    Ok(())
}

fn show_config(vault: Option<PathBuf>) -> Result<()> {
    let cfg = config::config()?;

    println!("vlinker Configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!("Vault:       {}", vault_root(vault)?.display());
    println!();
    println!("Settings:");
    let yaml = serde_yaml::to_string(&cfg.settings).context("Failed to render settings")?;
    for line in yaml.lines() {
        println!("  {}", line);
    }
    Ok(())
}
