mod writer_tests;

use crate::compiler::Toolkit;
use crate::config::CompileItem;
use crate::error::Result;
use crate::job::{CompileJob, JobReport};
use crate::writer::ModelWriter;
use logipard_types::FdomName;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Writer that records every call as a line of text
///
/// Blank content is dropped and content is trimmed, so tests only see the
/// text that matters. A custom tag named `wrap` feeds its body back to the
/// driver.
#[derive(Default)]
pub(crate) struct RecordingWriter {
    pub events: Vec<String>,
}

impl RecordingWriter {
    /// Events without the open/close/invalidate bookkeeping
    pub fn facts(&self) -> Vec<&str> {
        self.events
            .iter()
            .map(String::as_str)
            .filter(|e| !matches!(*e, "open" | "close") && !e.starts_with("invalidate "))
            .collect()
    }
}

impl ModelWriter for RecordingWriter {
    fn open_model_output(&mut self) -> Result<()> {
        self.events.push("open".to_string());
        Ok(())
    }

    fn close_model_output(&mut self) -> Result<()> {
        self.events.push("close".to_string());
        Ok(())
    }

    fn invalidate_source_file(&mut self, source_file: &str, new_dependencies: &[String]) -> Result<()> {
        self.events
            .push(format!("invalidate {} deps={:?}", source_file, new_dependencies));
        Ok(())
    }

    fn append_content(&mut self, target: &FdomName, content: &str, _source_file: &str) -> Result<()> {
        if !content.trim().is_empty() {
            self.events.push(format!("content {}: {}", target, content.trim()));
        }
        Ok(())
    }

    fn tag_to(&mut self, tag: &FdomName, target: &FdomName, _source_file: &str) -> Result<()> {
        self.events.push(format!("tag {} -> {}", tag, target));
        Ok(())
    }

    fn append_ref(&mut self, target: &FdomName, ref_name: &FdomName, text: &str, _source_file: &str) -> Result<()> {
        self.events.push(format!("ref {} -> {} ({})", target, ref_name, text));
        Ok(())
    }

    fn process_custom_tag(
        &mut self,
        target: &FdomName,
        tag_name: &str,
        toolkit: &mut Toolkit<'_, '_>,
        source_file: &str,
    ) -> Result<()> {
        match tag_name {
            "wrap" => {
                for item in toolkit.items() {
                    toolkit.process_tag(self, item)?;
                }
            }
            "resolve" => {
                let text = toolkit.text().unwrap_or_default();
                let parsed = toolkit.parse_name(&text);
                let resolved = toolkit.resolve_parsed_name(&parsed);
                self.events.push(format!(
                    "resolve {} in {} = {}",
                    text,
                    toolkit.current_scope_name(),
                    resolved
                ));
            }
            _ => {
                self.events.push(format!(
                    "custom {} {} {:?} from {}",
                    target,
                    tag_name,
                    toolkit.text(),
                    source_file
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Compile the given `(path, text)` inputs as one job into a recording writer
pub(crate) fn compile(files: &[(&str, &str)]) -> (RecordingWriter, JobReport) {
    let dir = tempdir().unwrap();
    for (rel, content) in files {
        write_file(dir.path(), rel, content);
    }
    let item = CompileItem::new(dir.path(), dir.path().join("out.json"));
    let mut writer = RecordingWriter::default();
    let report = CompileJob::new(item).run(&mut writer).unwrap();
    (writer, report)
}

pub(crate) fn codes(report: &JobReport) -> Vec<&str> {
    report.diagnostics.iter().map(|d| d.code.as_str()).collect()
}
