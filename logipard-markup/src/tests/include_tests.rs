use crate::include::InputLoader;
use crate::items::Item;
use logipard_types::DiagnosticCollector;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn all_text(items: &[Item]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            Item::Text(text) => out.push_str(text),
            Item::Tag(frame) => out.push_str(&all_text(&frame.items)),
        }
    }
    out
}

#[test]
fn test_relative_include_spliced() {
    let dir = tempdir().unwrap();
    write(dir.path(), "src/a.lpinput", "before <#LP-INCLUDE ./frag#> after");
    write(dir.path(), "src/frag.lpinput-inc", "<#LP x: included#>");

    let loader = InputLoader::new(dir.path(), "lp-includes");
    let mut diagnostics = DiagnosticCollector::new();
    let parsed = loader.load("src/a.lpinput", &mut diagnostics).unwrap();

    assert!(diagnostics.diagnostics().is_empty());
    assert_eq!(parsed.items.len(), 3);
    let frame = parsed.items[1].as_tag().unwrap();
    assert_eq!(frame.tag, "LP");
    assert_eq!(frame.naming.as_ref().unwrap().subject, vec!["x"]);
    assert_eq!(parsed.dependencies(), vec!["src/frag.lpinput-inc".to_string()]);
}

#[test]
fn test_module_lookup_walks_up() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/b/c.lpinput", "<#LP-INC shared/defs#>");
    write(dir.path(), "lp-includes/shared/defs.lpinput-inc", "shared text");

    let loader = InputLoader::new(dir.path(), "lp-includes");
    let mut diagnostics = DiagnosticCollector::new();
    let parsed = loader.load("a/b/c.lpinput", &mut diagnostics).unwrap();

    assert_eq!(all_text(&parsed.items), "shared text");
    assert!(parsed.touched_files.contains("lp-includes/shared/defs.lpinput-inc"));
}

#[test]
fn test_nearest_module_wins() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/c.lpinput", "<#LP-INC defs#>");
    write(dir.path(), "a/lp-includes/defs.lpinput-inc", "near");
    write(dir.path(), "lp-includes/defs.lpinput-inc", "far");

    let loader = InputLoader::new(dir.path(), "lp-includes");
    let mut diagnostics = DiagnosticCollector::new();
    let parsed = loader.load("a/c.lpinput", &mut diagnostics).unwrap();

    assert_eq!(all_text(&parsed.items), "near");
}

#[test]
fn test_recursive_include_ignored() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.lpinput", "<#LP-INCLUDE ./x#>");
    write(dir.path(), "x.lpinput-inc", "x<#LP-INCLUDE ./y#>");
    write(dir.path(), "y.lpinput-inc", "y<#LP-INCLUDE ./x#>");

    let loader = InputLoader::new(dir.path(), "lp-includes");
    let mut diagnostics = DiagnosticCollector::new();
    let parsed = loader.load("a.lpinput", &mut diagnostics).unwrap();

    assert_eq!(all_text(&parsed.items), "xy");
    assert!(diagnostics.has_code("include.recursive"));
}

#[test]
fn test_same_file_included_twice() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.lpinput", "<#LP-INCLUDE ./x#>-<#LP-INCLUDE ./x#>");
    write(dir.path(), "x.lpinput-inc", "x");

    let loader = InputLoader::new(dir.path(), "lp-includes");
    let mut diagnostics = DiagnosticCollector::new();
    let parsed = loader.load("a.lpinput", &mut diagnostics).unwrap();

    assert_eq!(all_text(&parsed.items), "x-x");
    assert!(diagnostics.diagnostics().is_empty());
}

#[test]
fn test_missing_include_is_warning() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.lpinput", "text<#LP-INCLUDE ./nope#>");

    let loader = InputLoader::new(dir.path(), "lp-includes");
    let mut diagnostics = DiagnosticCollector::new();
    let parsed = loader.load("a.lpinput", &mut diagnostics).unwrap();

    assert_eq!(all_text(&parsed.items), "text");
    assert!(diagnostics.has_code("include.not-found"));
}

#[test]
fn test_include_outside_root_rejected() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.lpinput", "<#LP-INCLUDE ../../etc/x#>");

    let loader = InputLoader::new(dir.path(), "lp-includes");
    let mut diagnostics = DiagnosticCollector::new();
    loader.load("a.lpinput", &mut diagnostics).unwrap();

    assert!(diagnostics.has_code("include.outside-root"));
}

#[test]
fn test_include_with_inner_tags_rejected() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.lpinput", "<#LP-INCLUDE ./x<#b#>#>");

    let loader = InputLoader::new(dir.path(), "lp-includes");
    let mut diagnostics = DiagnosticCollector::new();
    loader.load("a.lpinput", &mut diagnostics).unwrap();

    assert!(diagnostics.has_code("include.not-plain"));
}

#[test]
fn test_missing_top_level_is_error() {
    let dir = tempdir().unwrap();
    let loader = InputLoader::new(dir.path(), "lp-includes");
    let mut diagnostics = DiagnosticCollector::new();

    assert!(loader.load("missing.lpinput", &mut diagnostics).is_err());
}
