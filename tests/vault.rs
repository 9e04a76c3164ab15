//! Vault Integration Tests
//!
//! End-to-end tests over a vault on disk: metadata loading, annotation,
//! conversion written back to the note, and file tagging.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use vlinker::core::{Command, CommandOutcome};
use vlinker::vault::frontmatter;
use vlinker::{DocumentSurface, LinkerService, LinkerSettings, MetadataProvider, VaultProvider};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "Biology/Photosynthesis.md", "---\naliases: [PS]\ntags: [biology]\n---\nLight to sugar.\n");
    write(root, "Biology/Chlorophyll.md", "Green pigment. #pigment\n");
    write(root, "Chemistry/Glucose.md", "---\naliases: Dextrose\n---\nA sugar.\n");
    write(root, "Archive/Old notes.md", "Photosynthesis and Glucose\n");
    write(root, "Media/leaf.mp4", "binary");
    write(root, ".obsidian/workspace.json", "{}");
    write(
        root,
        "Daily/Today.md",
        "---\ntags: [daily]\n---\nPhotosynthesis needs Chlorophyll and makes Glucose (aka Dextrose).\n\n```\nGlucose in code\n```\n",
    );
    temp
}

fn service(root: &Path, settings: LinkerSettings) -> (Arc<VaultProvider>, LinkerService) {
    let provider = Arc::new(VaultProvider::new(root));
    let service = LinkerService::new(provider.clone(), settings).unwrap();
    (provider, service)
}

#[test]
fn test_vault_targets() {
    let temp = fixture();
    let provider = VaultProvider::new(temp.path());
    let targets = provider.targets().unwrap();

    let ids: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "Archive/Old notes.md",
            "Biology/Chlorophyll.md",
            "Biology/Photosynthesis.md",
            "Chemistry/Glucose.md",
            "Daily/Today.md",
            "Media/leaf.mp4",
        ]
    );

    let chlorophyll = &targets[1];
    assert_eq!(chlorophyll.tags, vec!["pigment"]);
    let glucose = &targets[3];
    assert_eq!(glucose.aliases, vec!["Dextrose"]);
}

#[test]
fn test_annotations_over_a_vault_note() {
    let temp = fixture();
    let (provider, service) = service(temp.path(), LinkerSettings::default());

    // Excluded extension never becomes a target
    let vocabulary = service.vocabulary();
    let mp4 = vocabulary.entries().iter().find(|e| e.target.as_str() == "Media/leaf.mp4");
    assert!(!mp4.unwrap().included);

    let doc = provider.read_document("Daily/Today.md").unwrap();
    let annotations = service.annotations(&doc);
    let texts: Vec<&str> = annotations.spans.iter().map(|s| s.source_text.as_str()).collect();
    assert_eq!(texts, vec!["Photosynthesis", "Chlorophyll", "Glucose", "Dextrose"]);

    let dextrose = annotations.spans.last().unwrap();
    assert!(dextrose.is_alias);
    assert_eq!(dextrose.candidates[0].target.as_str(), "Chemistry/Glucose.md");
}

#[test]
fn test_convert_all_and_write_back() {
    let temp = fixture();
    let (provider, service) = service(temp.path(), LinkerSettings::default());

    let mut doc = provider.read_document("Daily/Today.md").unwrap();
    let len = doc.text().len();
    let outcome = service
        .execute(&mut doc, Command::ConvertSelection { from: 0, to: len })
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Converted { failed: 0, .. }));

    provider.write_document("Daily/Today.md", doc.text()).unwrap();
    let written = std::fs::read_to_string(temp.path().join("Daily/Today.md")).unwrap();
    assert!(written.contains(
        "[[Photosynthesis]] needs [[Chlorophyll]] and makes [[Glucose]] (aka [[Glucose|Dextrose]])."
    ));
    assert!(written.contains("```\nGlucose in code\n```"));

    // Everything is now really linked
    let reread = provider.read_document("Daily/Today.md").unwrap();
    assert!(service.annotations(&reread).is_empty());
}

#[test]
fn test_excluded_directories_for_linking() {
    let temp = fixture();
    let settings = LinkerSettings {
        excluded_directories_for_linking: vec!["Archive".to_string()],
        ..Default::default()
    };
    let (provider, service) = service(temp.path(), settings);

    let doc = provider.read_document("Archive/Old notes.md").unwrap();
    assert!(service.annotations(&doc).is_empty());
}

#[test]
fn test_exclude_file_persists_tag() {
    let temp = fixture();
    let (provider, service) = service(temp.path(), LinkerSettings::default());
    let target = vlinker::TargetId::new("Biology/Chlorophyll.md");

    service.apply(Command::ExcludeFile(target.clone())).unwrap();

    let text = std::fs::read_to_string(temp.path().join("Biology/Chlorophyll.md")).unwrap();
    let props = frontmatter::parse(&text).unwrap();
    assert_eq!(frontmatter::string_list(&props, &["tags"]), vec!["linker-exclude"]);
    assert!(text.ends_with("Green pigment. #pigment\n"));

    let doc = provider.read_document("Daily/Today.md").unwrap();
    let texts: Vec<String> = service
        .annotations(&doc)
        .spans
        .iter()
        .map(|s| s.source_text.clone())
        .collect();
    assert!(!texts.contains(&"Chlorophyll".to_string()));

    service.apply(Command::IncludeFile(target)).unwrap();
    let doc = provider.read_document("Daily/Today.md").unwrap();
    let annotations = service.annotations(&doc);
    assert!(annotations.spans.iter().any(|s| s.source_text == "Chlorophyll"));
}
