//! Compile command implementation.

use anyhow::{bail, Context, Result};
use logipard_core::{CompileJob, Config, FileError, JobReport};
use logipard_types::{Diagnostic, DiagnosticSeverity};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ItemSummary<'a> {
    index: usize,
    out_file: &'a Path,
    skipped: bool,
    files: usize,
    errors: Vec<String>,
    warnings: usize,
    diagnostics: &'a [Diagnostic],
}

/// Run the compile stage for all (or one) configured items
pub fn compile_project(config_path: &Path, only_item: Option<usize>, json: bool) -> Result<()> {
    tracing::info!("Loading config from {:?}", config_path);
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let items = config.compile_items();

    let selected: Vec<usize> = match only_item {
        Some(index) if index >= items.len() => {
            bail!("Compile item {} does not exist ({} configured)", index, items.len())
        }
        Some(index) => vec![index],
        None => (0..items.len()).collect(),
    };
    if selected.is_empty() {
        tracing::warn!("No compile items configured in {:?}", config_path);
    }

    let mut reports: Vec<(usize, PathBuf, bool, JobReport)> = Vec::new();
    for index in selected {
        let item = items[index].clone();
        let skipped = item.skip;
        let out_file = item.out_file.clone();
        // a broken model file fails the item, the remaining items still run
        let report = CompileJob::new(item).run_to_json().unwrap_or_else(|err| {
            tracing::error!("Compile item {} failed: {}", index, err);
            JobReport {
                errors: vec![FileError {
                    file: out_file.display().to_string(),
                    message: err.to_string(),
                }],
                ..JobReport::default()
            }
        });
        reports.push((index, out_file, skipped, report));
    }

    let summaries: Vec<ItemSummary<'_>> = reports
        .iter()
        .map(|(index, out_file, skipped, report)| ItemSummary {
            index: *index,
            out_file,
            skipped: *skipped,
            files: report.files_processed,
            errors: report
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.file, e.message))
                .collect(),
            warnings: report
                .diagnostics
                .iter()
                .filter(|d| d.severity == DiagnosticSeverity::Warning)
                .count(),
            diagnostics: &report.diagnostics,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            if summary.skipped {
                println!("Item {}: skipped", summary.index);
                continue;
            }
            println!(
                "Item {}: {} files compiled into {:?}, {} errors, {} warnings",
                summary.index,
                summary.files,
                summary.out_file,
                summary.errors.len(),
                summary.warnings
            );
            for error in &summary.errors {
                println!("  error: {}", error);
            }
        }
    }

    let failed: usize = summaries.iter().map(|s| s.errors.len()).sum();
    if failed > 0 {
        bail!("{} input files failed to compile", failed);
    }
    Ok(())
}
