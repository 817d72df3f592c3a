//! Model writer backed by an FDOM persisted as JSON.

use crate::compiler::Toolkit;
use crate::config::{CompileItem, ExtraTagKind};
use crate::error::{CompileError, Result};
use crate::writer::ModelWriter;
use base64::{engine::general_purpose::STANDARD, Engine};
use logipard_fdom::Fdom;
use logipard_markup::normalize_path;
use logipard_types::FdomName;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes compile output into an [`Fdom`] loaded from and saved to `out_file`
///
/// Opening loads the existing model, so facts from inputs that were not
/// recompiled survive. Closing drops facts of inputs that got no writes in
/// this session, prunes dead nodes and saves.
pub struct JsonModelWriter {
    out_file: PathBuf,
    in_root_dir: PathBuf,
    work_dir: PathBuf,
    extra_tags: BTreeMap<String, ExtraTagKind>,
    uid_base: Option<String>,
    model: Option<Fdom>,
    used_source_files: HashSet<String>,
}

impl JsonModelWriter {
    pub fn new(item: &CompileItem) -> Self {
        Self {
            out_file: item.out_file.clone(),
            in_root_dir: item.in_root_dir.clone(),
            work_dir: item.work_dir.clone(),
            extra_tags: item.extra_tags.clone(),
            uid_base: None,
            model: None,
            used_source_files: HashSet::new(),
        }
    }

    /// Use a fixed UID base for new nodes
    pub fn with_uid_base(mut self, base: impl Into<String>) -> Self {
        self.uid_base = Some(base.into());
        self
    }

    fn model_mut(&mut self) -> Result<&mut Fdom> {
        self.model.as_mut().ok_or(CompileError::NotOpen)
    }

    /// Read the file a `file` tag names and encode it as a data URL
    fn embed_file(&self, path_text: &str, source_file: &str) -> std::io::Result<String> {
        let path = match path_text.strip_prefix(&['/', '\\'][..]) {
            Some(project_relative) => self.work_dir.join(project_relative),
            None => {
                let relative = normalize_path(&format!("{}/../{}", source_file, path_text));
                self.in_root_dir.join(relative)
            }
        };
        let bytes = fs::read(&path)?;
        Ok(format!("data:{};base64,{}", mime_type(&path), STANDARD.encode(bytes)))
    }
}

impl ModelWriter for JsonModelWriter {
    fn open_model_output(&mut self) -> Result<()> {
        let mut model = match &self.uid_base {
            Some(base) => Fdom::with_uid_base(base),
            None => Fdom::new(),
        };
        model.load_from_file(&self.out_file, true)?;
        tracing::debug!(
            "Opened model {:?} ({} source files)",
            self.out_file,
            model.source_files().len()
        );
        self.model = Some(model);
        self.used_source_files.clear();
        Ok(())
    }

    fn close_model_output(&mut self) -> Result<()> {
        let Some(mut model) = self.model.take() else {
            return Err(CompileError::NotOpen);
        };
        for source_file in model.source_files() {
            if !self.used_source_files.contains(&source_file) {
                tracing::debug!("Dropping facts of vanished input {}", source_file);
                model.invalidate_source_file(&source_file);
            }
        }
        model.cleanup_model();
        model.save_to_file(&self.out_file)?;
        tracing::info!("Saved model to {:?}", self.out_file);
        Ok(())
    }

    fn invalidate_source_file(&mut self, source_file: &str, _new_dependencies: &[String]) -> Result<()> {
        self.used_source_files.insert(source_file.to_string());
        self.model_mut()?.invalidate_source_file(source_file);
        Ok(())
    }

    fn append_content(&mut self, target: &FdomName, content: &str, source_file: &str) -> Result<()> {
        self.used_source_files.insert(source_file.to_string());
        let model = self.model_mut()?;
        let node = model.node_by_name(target.segments());
        model.add_content(node, content, source_file);
        Ok(())
    }

    fn tag_to(&mut self, tag: &FdomName, target: &FdomName, source_file: &str) -> Result<()> {
        self.used_source_files.insert(source_file.to_string());
        let model = self.model_mut()?;
        let target_node = model.node_by_name(target.segments());
        let tag_node = model.node_by_name(tag.segments());
        model.add_tag(target_node, tag_node, source_file);
        Ok(())
    }

    fn append_ref(&mut self, target: &FdomName, ref_name: &FdomName, text: &str, source_file: &str) -> Result<()> {
        self.used_source_files.insert(source_file.to_string());
        let model = self.model_mut()?;
        let target_node = model.node_by_name(target.segments());
        let ref_node = model.node_by_name(ref_name.segments());
        model.add_ref(target_node, ref_node, text, source_file);
        Ok(())
    }

    fn process_custom_tag(
        &mut self,
        target: &FdomName,
        tag_name: &str,
        toolkit: &mut Toolkit<'_, '_>,
        source_file: &str,
    ) -> Result<()> {
        self.used_source_files.insert(source_file.to_string());
        let tag_name = tag_name.to_lowercase();

        let Some(kind) = self.extra_tags.get(&tag_name).copied() else {
            toolkit.warning(
                "custom-tag.unsupported",
                format!(
                    "custom tag {} (inside {}) is not specified in extra_tags and is not supported, ignored",
                    tag_name, target
                ),
            );
            return Ok(());
        };
        let Some(text) = toolkit.text() else {
            toolkit.warning(
                "custom-tag.not-plain",
                format!(
                    "extra custom tag {} (inside {}) ignored - the content must be a plain string",
                    tag_name, target
                ),
            );
            return Ok(());
        };

        let payload = match kind {
            ExtraTagKind::Text => serde_json::json!({ "name": tag_name, "text": text }),
            ExtraTagKind::File => match self.embed_file(&text, source_file) {
                Ok(url) => serde_json::json!({ "name": tag_name, "file": url }),
                Err(err) => {
                    toolkit.warning(
                        "custom-tag.file-unreadable",
                        format!(
                            "extra custom tag {} (inside {}): error reading file {} - {}",
                            tag_name, target, text, err
                        ),
                    );
                    return Ok(());
                }
            },
        };

        let model = self.model_mut()?;
        let node = model.node_by_name(target.segments());
        model.add_custom_tag(node, payload, source_file);
        Ok(())
    }
}

fn mime_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(Path::new("a/b.PNG")), "image/png");
        assert_eq!(mime_type(Path::new("icons/logo.svg")), "image/svg+xml");
        assert_eq!(mime_type(Path::new("docs/style.css")), "text/css");
        assert_eq!(mime_type(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_writes_require_open() {
        let item = CompileItem::new("in", "out/fdom.json");
        let mut writer = JsonModelWriter::new(&item);
        let err = writer.append_content(&FdomName::from_path("a"), "x", "f").unwrap_err();
        assert!(matches!(err, CompileError::NotOpen));
    }
}
