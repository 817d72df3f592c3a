//! Compile job runner: discover inputs, feed them through one session, keep going on failure.

use crate::compiler::CompileSession;
use crate::config::CompileItem;
use crate::error::Result;
use crate::json_writer::JsonModelWriter;
use crate::writer::ModelWriter;
use logipard_markup::{unify_path, InputLoader, INPUT_EXT};
use logipard_types::Diagnostic;
use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// A hard failure confined to one input file
#[derive(Debug, Clone)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// Outcome of one compile job
#[derive(Debug, Default)]
pub struct JobReport {
    pub files_processed: usize,
    pub errors: Vec<FileError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct CompileJob {
    item: CompileItem,
}

impl CompileJob {
    pub fn new(item: CompileItem) -> Self {
        Self { item }
    }

    pub fn item(&self) -> &CompileItem {
        &self.item
    }

    /// Run the job into the item's JSON model file
    pub fn run_to_json(&self) -> Result<JobReport> {
        let mut writer = JsonModelWriter::new(&self.item);
        self.run(&mut writer)
    }

    /// Compile every input of the item through `writer`
    ///
    /// Errors in one file are recorded and the next file is processed. The
    /// writer is closed even if some files failed; only failing to open or
    /// close it aborts the job.
    pub fn run(&self, writer: &mut dyn ModelWriter) -> Result<JobReport> {
        let mut report = JobReport::default();
        if self.item.skip {
            tracing::warn!(
                "Compile item {:?} is marked skip, not compiling",
                self.item.in_root_dir
            );
            return Ok(report);
        }

        let inputs = self.discover_inputs();
        tracing::info!(
            "Compiling {} input files from {:?}",
            inputs.len(),
            self.item.in_root_dir
        );

        let loader = InputLoader::new(&self.item.in_root_dir, &self.item.lookup_dir_name);
        let mut session = CompileSession::new();

        writer.open_model_output()?;
        for source_file in &inputs {
            let outcome = match loader.load(source_file, session.diagnostics_mut()) {
                Ok(parsed) => session.compile_file(&parsed, &mut *writer),
                Err(err) => Err(err.into()),
            };
            match outcome {
                Ok(()) => report.files_processed += 1,
                Err(err) => {
                    tracing::error!("Failed to compile {}: {}", source_file, err);
                    report.errors.push(FileError {
                        file: source_file.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
        let closed = writer.close_model_output();

        report.diagnostics = session.take_diagnostics();
        closed?;
        Ok(report)
    }

    /// Root-relative paths of all `*.lpinput` files, sorted
    pub fn discover_inputs(&self) -> Vec<String> {
        let root = &self.item.in_root_dir;
        let ignore_patterns = compile_ignore_patterns(&self.item.ignore_patterns);
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let is_input = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(INPUT_EXT));
            if !is_input {
                continue;
            }

            let rel = relative_input_path(root, entry.path());
            if should_ignore(&rel, &ignore_patterns) {
                tracing::debug!("Ignoring {} due to ignore_patterns", rel);
                continue;
            }
            files.push(rel);
        }

        files.sort();
        files
    }
}

fn relative_input_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    unify_path(&rel.to_string_lossy())
}

fn compile_ignore_patterns(patterns: &[String]) -> Vec<Regex> {
    let mut compiled = Vec::new();
    for pat in patterns {
        match Regex::new(pat) {
            Ok(re) => compiled.push(re),
            Err(err) => tracing::warn!("Invalid ignore pattern '{}': {}", pat, err),
        }
    }
    compiled
}

fn should_ignore(path: &str, ignores: &[Regex]) -> bool {
    ignores.iter().any(|re| re.is_match(path))
}
