//! Input file loading and `LP-INCLUDE` resolution.
//!
//! Paths handled here are relative to the input root directory and always
//! use `/` separators.

use crate::error::{MarkupError, Result};
use crate::items::{Item, TagFrame};
use crate::names::extract_naming;
use crate::parser::parse_markup;
use logipard_types::DiagnosticCollector;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of extracted top-level inputs
pub const INPUT_EXT: &str = ".lpinput";

/// Extension of extracted include fragments
pub const INCLUDE_EXT: &str = ".lpinput-inc";

/// Default directory name searched by module-style includes
pub const DEFAULT_LOOKUP_DIR_NAME: &str = "lp-includes";

/// A parsed and pre-processed top-level input file
#[derive(Debug, Clone)]
pub struct ParsedInput {
    /// Root-relative path of the file
    pub source_file: String,
    pub items: Vec<Item>,
    /// Every file read to build `items`, the file itself included
    pub touched_files: BTreeSet<String>,
}

impl ParsedInput {
    /// Files this input depends on through includes
    pub fn dependencies(&self) -> Vec<String> {
        self.touched_files
            .iter()
            .filter(|f| **f != self.source_file)
            .cloned()
            .collect()
    }
}

/// Loads input files from a root directory and resolves their includes
#[derive(Debug, Clone)]
pub struct InputLoader {
    in_root_dir: PathBuf,
    lookup_dir_name: String,
}

struct LoadState<'a> {
    active: HashSet<String>,
    touched: BTreeSet<String>,
    diagnostics: &'a mut DiagnosticCollector,
}

impl InputLoader {
    pub fn new(in_root_dir: impl Into<PathBuf>, lookup_dir_name: impl Into<String>) -> Self {
        Self {
            in_root_dir: in_root_dir.into(),
            lookup_dir_name: lookup_dir_name.into(),
        }
    }

    /// Read, parse and pre-process a top-level input file
    ///
    /// `source_file` is relative to the input root. An unreadable top-level
    /// file is an error; problems with its includes are only diagnostics.
    pub fn load(&self, source_file: &str, diagnostics: &mut DiagnosticCollector) -> Result<ParsedInput> {
        let normal = unify_path(source_file);
        let path = self.in_root_dir.join(&normal);
        let text = fs::read_to_string(&path).map_err(|source| MarkupError::Io { path, source })?;

        let mut state = LoadState {
            active: HashSet::new(),
            touched: BTreeSet::new(),
            diagnostics,
        };
        state.active.insert(normal.clone());
        state.touched.insert(normal.clone());

        let raw = parse_markup(&text, &normal, state.diagnostics);
        let items = self.preprocess(raw, &normal, &normal, &mut state)?;

        Ok(ParsedInput {
            source_file: normal,
            items,
            touched_files: state.touched,
        })
    }

    /// Extract naming parts and splice includes, recursively
    ///
    /// `file_path` is the file the items were read from (for relative
    /// includes); `report_file` is the top-level file diagnostics go to.
    fn preprocess(
        &self,
        items: Vec<Item>,
        file_path: &str,
        report_file: &str,
        state: &mut LoadState<'_>,
    ) -> Result<Vec<Item>> {
        let mut result = Vec::with_capacity(items.len());

        for item in items {
            let mut frame = match item {
                Item::Text(_) => {
                    result.push(item);
                    continue;
                }
                Item::Tag(frame) => frame,
            };

            match frame.directive().as_str() {
                "LP" | "LP-MACRO" | "LP-TAG-ON" | "LP-ALIAS" | "REF" | "" => {
                    frame.naming = Some(extract_naming(&mut frame.items));
                }
                "LP-INCLUDE" | "LP-INC" => {
                    let included = self.include(&frame, file_path, report_file, state)?;
                    result.extend(included);
                    continue;
                }
                _ => {}
            }

            let children = std::mem::take(&mut frame.items);
            frame.items = self.preprocess(children, file_path, report_file, state)?;
            result.push(Item::Tag(frame));
        }

        Ok(result)
    }

    fn include(
        &self,
        frame: &TagFrame,
        file_path: &str,
        report_file: &str,
        state: &mut LoadState<'_>,
    ) -> Result<Vec<Item>> {
        let Some(target) = frame.plain_text() else {
            state.diagnostics.warning(
                report_file,
                "include.not-plain",
                "Include tag ignored - the path must be a plain string with no inner tags".to_string(),
            );
            return Ok(Vec::new());
        };

        let target = format!("{}{}", target.trim(), INCLUDE_EXT);
        let parent = format!("{}/..", file_path);
        if target.starts_with("./") || target.starts_with("../") {
            let path = normalize_path(&format!("{}/{}", parent, target));
            self.read_included(&path, None, report_file, state)
        } else {
            let lookup = normalize_path(&format!("{}/{}", parent, self.lookup_dir_name));
            self.read_included(&target, Some(lookup), report_file, state)
        }
    }

    fn read_included(
        &self,
        file_path: &str,
        mut module_lookup: Option<String>,
        report_file: &str,
        state: &mut LoadState<'_>,
    ) -> Result<Vec<Item>> {
        if file_path.starts_with('/') || Path::new(file_path).is_absolute() {
            state.diagnostics.warning(
                report_file,
                "include.absolute-path",
                format!("File {} ignored: path must be relative and specify a file", strip_for_report(file_path)),
            );
            return Ok(Vec::new());
        }

        let mut lookup_progress = false;
        let mut found: Option<(String, String)> = None;

        loop {
            let actual = match &module_lookup {
                Some(lookup) => normalize_path(&format!("{}/{}", lookup, file_path)),
                None => normalize_path(file_path),
            };

            if escapes_root(&actual) {
                if !lookup_progress {
                    state.diagnostics.warning(
                        report_file,
                        "include.outside-root",
                        format!(
                            "File {} ignored: effective path must not get above the input root ({})",
                            strip_for_report(file_path),
                            self.in_root_dir.display()
                        ),
                    );
                    return Ok(Vec::new());
                }
                break;
            }

            if state.active.contains(&actual) {
                state.diagnostics.warning(
                    report_file,
                    "include.recursive",
                    format!("File {} ignored: recursively included", strip_for_report(file_path)),
                );
                return Ok(Vec::new());
            }

            let path = self.in_root_dir.join(&actual);
            match fs::read_to_string(&path) {
                Ok(text) => {
                    found = Some((actual, text));
                    break;
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(MarkupError::Io { path, source }),
            }

            let Some(lookup) = &module_lookup else { break };
            // one level up: back out of the lookup dir and its parent
            let next = normalize_path(&format!("{}/../../{}", lookup, self.lookup_dir_name));
            if &next == lookup {
                break;
            }
            module_lookup = Some(next);
            lookup_progress = true;
        }

        let Some((normal, text)) = found else {
            let message = if module_lookup.is_some() {
                format!(
                    "Include file {} ignored: not found via {} lookup",
                    strip_for_report(file_path),
                    self.lookup_dir_name
                )
            } else {
                format!(
                    "File {} ignored: not found via the direct path",
                    strip_for_report(file_path)
                )
            };
            state.diagnostics.warning(report_file, "include.not-found", message);
            return Ok(Vec::new());
        };

        tracing::debug!("Including {} into {}", normal, report_file);
        state.active.insert(normal.clone());
        state.touched.insert(normal.clone());
        let raw = parse_markup(&text, &normal, state.diagnostics);
        let items = self.preprocess(raw, &normal, report_file, state);
        state.active.remove(&normal);
        items
    }
}

/// Replace `\` with `/`
pub fn unify_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Lexically normalize a relative `/`-path, resolving `.` and `..`
///
/// Leading `..` segments that cannot be resolved are kept.
pub fn normalize_path(path: &str) -> String {
    let unified = unify_path(path);
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

fn escapes_root(normal: &str) -> bool {
    normal == ".." || normal.starts_with("../")
}

fn strip_for_report(file: &str) -> String {
    for ext in [INCLUDE_EXT, INPUT_EXT] {
        if let Some(stem) = file.strip_suffix(ext) {
            return format!("{} ({})", stem, ext);
        }
    }
    file.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("a/b/../c"), "a/c");
        assert_eq!(normalize_path("a/./b"), "a/b");
        assert_eq!(normalize_path("a/../../b"), "../b");
        assert_eq!(normalize_path("a\\b"), "a/b");
        assert_eq!(normalize_path("a/.."), ".");
    }

    #[test]
    fn test_unify_path() {
        assert_eq!(unify_path("src\\mod\\a.lpinput"), "src/mod/a.lpinput");
        assert_eq!(unify_path("plain/path"), "plain/path");
    }

    #[test]
    fn test_strip_for_report() {
        assert_eq!(strip_for_report("x/y.lpinput-inc"), "x/y (.lpinput-inc)");
        assert_eq!(strip_for_report("x/y.txt"), "x/y.txt");
    }
}
