//! The compile driver: interprets a parsed item tree and emits model
//! mutations through a [`ModelWriter`].
//!
//! A [`CompileSession`] lives for one compile job and owns the name-usage
//! tree. Each top-level file gets a fresh [`FileCompiler`] with its own scope
//! stack and `~` counter.

use crate::error::Result;
use crate::name_tree::{NameId, NameKind, NameTree};
use crate::resolver::{resolve_name, ScopeEntry};
use crate::writer::ModelWriter;
use logipard_markup::{parse_name, Delimiter, Item, Naming, ParsedInput, TagFrame};
use logipard_types::{is_updir_segment, Diagnostic, DiagnosticCollector, FdomName};
use std::collections::HashSet;
use std::rc::Rc;

/// Compile state shared by all files of one job
#[derive(Debug, Default)]
pub struct CompileSession {
    names: NameTree,
    diagnostics: DiagnosticCollector,
}

impl CompileSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &DiagnosticCollector {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticCollector {
        &mut self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    /// Invalidate the file's previous facts, then compile its items
    pub fn compile_file(&mut self, parsed: &ParsedInput, writer: &mut dyn ModelWriter) -> Result<()> {
        tracing::debug!("Compiling {}", parsed.source_file);
        writer.invalidate_source_file(&parsed.source_file, &parsed.dependencies())?;
        let mut compiler = FileCompiler::new(self, &parsed.source_file);
        compiler.process_items(writer, &parsed.items)
    }
}

/// Per-file interpreter state
pub struct FileCompiler<'s> {
    session: &'s mut CompileSession,
    source_file: String,
    stack: Vec<ScopeEntry>,
    literal_scope: Vec<String>,
    scope_node: NameId,
    tilde_count: usize,
    /// macros currently being expanded, innermost last
    expanding: Vec<NameId>,
    recursion_reported: HashSet<NameId>,
}

impl<'s> FileCompiler<'s> {
    pub fn new(session: &'s mut CompileSession, source_file: &str) -> Self {
        let root = session.names.root();
        let mut compiler = Self {
            session,
            source_file: source_file.to_string(),
            stack: Vec::new(),
            literal_scope: Vec::new(),
            scope_node: root,
            tilde_count: 0,
            expanding: Vec::new(),
            recursion_reported: HashSet::new(),
        };
        compiler.refresh_scope();
        compiler
    }

    /// Canonical, alias-resolved name of the current scope
    pub fn scope_name(&self) -> FdomName {
        FdomName(self.session.names.full_name(self.scope_node).to_vec())
    }

    fn warn(&mut self, code: &str, message: String) {
        self.session.diagnostics.warning(&self.source_file, code, message);
    }

    fn refresh_scope(&mut self) {
        self.literal_scope = resolve_name(&self.stack, &[]);
        self.scope_node = self.session.names.lookup(&self.literal_scope, false, true);
        self.session.names.mark_used(self.scope_node);
    }

    /// Name-usage node for a name as written in the current scope
    fn lookup(&mut self, name: &[String], reference_on_new: bool, resolve_last_alias: bool) -> NameId {
        let resolved = resolve_name(&self.stack, name);
        self.session.names.lookup(&resolved, reference_on_new, resolve_last_alias)
    }

    fn full_name(&self, id: NameId) -> FdomName {
        FdomName(self.session.names.full_name(id).to_vec())
    }

    fn next_anonymous(&mut self) -> String {
        self.tilde_count += 1;
        format!("#anon:{}:{}", encode_uri_component(&self.source_file), self.tilde_count)
    }

    fn expand_tildes(&mut self, name: &[String]) -> Vec<String> {
        if name.len() == 1 && name[0] == "~" {
            return vec![".".to_string(), self.next_anonymous()];
        }
        name.iter()
            .map(|segment| {
                if segment == "~" {
                    self.next_anonymous()
                } else {
                    segment.clone()
                }
            })
            .collect()
    }

    pub fn process_items(&mut self, writer: &mut dyn ModelWriter, items: &[Item]) -> Result<()> {
        for item in items {
            self.process_item(writer, item)?;
        }
        Ok(())
    }

    pub fn process_item(&mut self, writer: &mut dyn ModelWriter, item: &Item) -> Result<()> {
        match item {
            Item::Text(text) => writer.append_content(&self.scope_name(), text, &self.source_file),
            Item::Tag(frame) => self.process_frame(writer, frame),
        }
    }

    fn process_frame(&mut self, writer: &mut dyn ModelWriter, frame: &TagFrame) -> Result<()> {
        match frame.directive().as_str() {
            "LP" | "" => self.process_lp(writer, frame),
            "LP-TAG-ON" => self.process_tag_on(writer, frame),
            "LP-MACRO" => {
                self.define_macro(frame);
                Ok(())
            }
            "LP-ALIAS" => {
                self.define_alias(frame);
                Ok(())
            }
            "LP-TRACE-WHERE" => {
                self.trace_where(frame);
                Ok(())
            }
            "REF" => self.process_ref(writer, frame),
            directive if directive.starts_with("LP-") => {
                self.warn(
                    "directive.unsupported",
                    format!("unsupported LP tag {} ignored", &frame.tag[3..]),
                );
                Ok(())
            }
            _ => self.process_custom(writer, frame),
        }
    }

    fn process_lp(&mut self, writer: &mut dyn ModelWriter, frame: &TagFrame) -> Result<()> {
        let naming = frame.naming.clone().unwrap_or_default();

        if naming.delimiter == Delimiter::Close {
            self.pop_scope(&naming.subject);
            self.refresh_scope();
            // the rest of the body lands in the scope we popped back to
            return self.process_items(writer, &frame.items);
        }

        let subject = self.expand_tildes(&naming.subject);
        let subject_node = self.lookup(&subject, false, true);
        if let Some(macro_frame) = self.session.names.macro_frame(subject_node) {
            if !naming.added_tags.is_empty() || !frame.is_blank() {
                let message = format!(
                    "subject name {} refers to macro ({}) and so is handled as macro expansion - ignoring the added tags and content",
                    FdomName(naming.subject.clone()),
                    self.full_name(subject_node)
                );
                self.warn("macro.extras-ignored", message);
            }
            return self.expand_macro(writer, subject_node, &macro_frame);
        }

        let mut tag_nodes = Vec::new();
        let mut macro_frames = Vec::new();
        for tag in &naming.added_tags {
            let tag_node = self.lookup(tag, true, true);
            match self.session.names.macro_frame(tag_node) {
                Some(macro_frame) => macro_frames.push((tag_node, macro_frame)),
                None => tag_nodes.push(tag_node),
            }
        }

        let base = self.stack.len();
        self.stack.push(ScopeEntry::Level(subject));
        self.stack.push(ScopeEntry::Fence);
        if naming.delimiter != Delimiter::Open {
            // a plain digression must not leak scope past its own body
            self.stack.push(ScopeEntry::Fence);
        }
        self.refresh_scope();

        let target = self.scope_name();
        for tag_node in tag_nodes {
            writer.tag_to(&self.full_name(tag_node), &target, &self.source_file)?;
        }
        for (macro_node, macro_frame) in macro_frames {
            self.expand_macro(writer, macro_node, &macro_frame)?;
        }
        self.process_items(writer, &frame.items)?;

        // pops inside the body never cross the fence at `base + 1`
        if naming.delimiter == Delimiter::Open {
            self.stack.remove(base + 1);
        } else {
            self.stack.truncate(base);
        }
        self.refresh_scope();
        Ok(())
    }

    fn expand_macro(
        &mut self,
        writer: &mut dyn ModelWriter,
        macro_node: NameId,
        macro_frame: &Rc<TagFrame>,
    ) -> Result<()> {
        if self.expanding.contains(&macro_node) {
            if self.recursion_reported.insert(macro_node) {
                let message = format!(
                    "macro {} used inside its own expansion - inner use skipped",
                    self.full_name(macro_node)
                );
                self.warn("macro.recursive", message);
            }
            return Ok(());
        }
        self.expanding.push(macro_node);
        let result = self.process_lp(writer, macro_frame);
        self.expanding.pop();
        result
    }

    /// Handle a `}` digression: unwind to a named (or the last) level
    fn pop_scope(&mut self, subject: &[String]) {
        let mut target = subject.first().cloned().unwrap_or_default();
        let mut bad_name = false;
        let mut remain = false;
        if is_updir_segment(&target) {
            bad_name = true;
            target.clear();
        }
        if subject.len() > 1 {
            if subject.len() == 2 && subject[1] == "." {
                remain = true;
            } else {
                bad_name = true;
            }
        }
        if bad_name {
            let message = format!(
                "when '}}'-popping name (got {}), only no name, single-segment-name or single-segment-name/. is allowed, will only use first segment ({})",
                FdomName(subject.to_vec()),
                target
            );
            self.warn("scope.bad-pop-name", message);
        }

        let mut over_pop = false;
        if target.is_empty() {
            match self.stack.last() {
                Some(ScopeEntry::Level(_)) => {
                    self.stack.pop();
                }
                Some(ScopeEntry::Fence) | None => over_pop = true,
            }
        } else {
            loop {
                let Some(ScopeEntry::Level(level)) = self.stack.last_mut() else {
                    over_pop = true;
                    break;
                };
                let mut found = false;
                while let Some(segment) = level.pop() {
                    if segment == target {
                        found = true;
                        if remain {
                            level.push(segment);
                        }
                        break;
                    }
                }
                if level.is_empty() {
                    self.stack.pop();
                }
                if found {
                    break;
                }
            }
        }

        if over_pop {
            let message = format!(
                "'}}'-pop of {} reaches beyond the enclosing digression, ignored",
                if target.is_empty() { "the last scope" } else { target.as_str() }
            );
            self.warn("scope.over-pop", message);
        }
    }

    fn process_tag_on(&mut self, writer: &mut dyn ModelWriter, frame: &TagFrame) -> Result<()> {
        if !frame.is_blank() {
            self.warn(
                "tag-on.content",
                "incorrect LP-tag-on ignored - only target name(s) and no content is expected".to_string(),
            );
            return Ok(());
        }

        let naming = frame.naming.clone().unwrap_or_default();
        let scope = self.scope_name();
        for target_name in std::iter::once(&naming.subject).chain(naming.added_tags.iter()) {
            let target = self.lookup(target_name, false, true);
            if matches!(self.session.names.kind(target), NameKind::Macro(_)) {
                let message = format!(
                    "LP-tag-on - ignored target name {} as it refers to a macro ({})",
                    FdomName(target_name.clone()),
                    self.full_name(target)
                );
                self.warn("tag-on.macro-target", message);
                continue;
            }
            writer.tag_to(&scope, &self.full_name(target), &self.source_file)?;
        }
        Ok(())
    }

    fn define_macro(&mut self, frame: &TagFrame) {
        let naming = frame.naming.clone().unwrap_or_default();
        let subject = FdomName(naming.subject.clone());
        if naming.delimiter != Delimiter::None {
            self.warn(
                "macro.bad-delimiter",
                format!("skipping LP-macro {} - '{{' and '}}' delimiters are not allowed in macro definitions", subject),
            );
            return;
        }

        let macro_node = self.lookup(&naming.subject, false, true);
        if !matches!(self.session.names.kind(macro_node), NameKind::New | NameKind::Macro(_)) {
            let message = format!(
                "skipping LP-macro {} - the target actual name ({}) is already used or referenced, and is not a macro",
                subject,
                self.full_name(macro_node)
            );
            self.warn("macro.name-in-use", message);
            return;
        }

        // the stored item behaves as `<#LP . <added tags>: <items>#>`
        let stored = TagFrame {
            tag: "LP".to_string(),
            items: frame.items.clone(),
            naming: Some(Naming {
                subject: Vec::new(),
                added_tags: naming.added_tags,
                delimiter: Delimiter::None,
            }),
        };
        self.session.names.set_kind(macro_node, NameKind::Macro(Rc::new(stored)));
    }

    fn define_alias(&mut self, frame: &TagFrame) {
        let naming = frame.naming.clone().unwrap_or_default();
        let subject = FdomName(naming.subject.clone());
        let Some(target_text) = frame.plain_text() else {
            self.warn(
                "alias.bad-target",
                format!(
                    "incorrect LP-alias {} ignored - the target specifier must be a plain string with no inner tags, and it must be an item name",
                    subject
                ),
            );
            return;
        };
        if !naming.added_tags.is_empty() {
            self.warn(
                "alias.tags-ignored",
                format!("added tags in LP-alias {} ignored - no tags is expected when (re)defining an alias", subject),
            );
        }

        let target = self.lookup(&parse_name(target_text), false, true);
        let source = self.lookup(&naming.subject, false, false);
        if !matches!(self.session.names.kind(source), NameKind::New | NameKind::Alias(_)) {
            let message = format!(
                "skipping LP-alias {} - the aliased name ({}) is already used or referenced, and is not an alias",
                subject,
                self.full_name(source)
            );
            self.warn("alias.name-in-use", message);
            return;
        }
        self.session.names.set_kind(source, NameKind::Alias(target));
    }

    fn trace_where(&mut self, frame: &TagFrame) {
        let label = frame
            .items
            .first()
            .and_then(Item::as_text)
            .map(str::trim)
            .unwrap_or("");
        let label = if label.is_empty() {
            String::new()
        } else {
            format!(" (label: {})", label)
        };
        let message = format!("scope report for LP-TRACE-WHERE{} location:\n{}", label, self.scope_dump());
        self.session.diagnostics.info(&self.source_file, "trace.where", message);
    }

    /// Human-readable dump of the current scope and stack
    pub fn scope_dump(&self) -> String {
        let mut lines = Vec::new();
        let mut in_fence = false;
        for entry in &self.stack {
            match entry {
                ScopeEntry::Level(level) if level.is_empty() => {}
                ScopeEntry::Level(level) => {
                    lines.push(level.join("/"));
                    in_fence = false;
                }
                ScopeEntry::Fence => {
                    if !in_fence {
                        lines.push("-- digression fence".to_string());
                    }
                    in_fence = true;
                }
            }
        }
        format!(
            "- Actual: {}\n- Literal: {}\n- Scopes stack (inline verbatim):\n\t{}",
            self.scope_name(),
            self.literal_scope.join("/"),
            lines.join("\n\t")
        )
    }

    fn process_ref(&mut self, writer: &mut dyn ModelWriter, frame: &TagFrame) -> Result<()> {
        let naming = frame.naming.clone().unwrap_or_default();
        if frame.plain_text().is_none() || !naming.added_tags.is_empty() {
            self.warn(
                "ref.extras-ignored",
                "REF tag must only contain target item and optional string content with no inner tags - extras are ignored"
                    .to_string(),
            );
        }

        let target = self.lookup(&naming.subject, false, true);
        if matches!(self.session.names.kind(target), NameKind::Macro(_)) {
            let message = format!("REF tag ignored - the target name {} refers to a macro", self.full_name(target));
            self.warn("ref.macro-target", message);
            return Ok(());
        }
        let target_name = self.full_name(target);
        if target_name.is_root() {
            self.warn(
                "ref.root-target",
                "REF tag ignored - references to root item are not allowed".to_string(),
            );
            return Ok(());
        }

        let text = frame
            .items
            .first()
            .and_then(Item::as_text)
            .map(str::trim)
            .unwrap_or("");
        writer.append_ref(&self.scope_name(), &target_name, text, &self.source_file)
    }

    fn process_custom(&mut self, writer: &mut dyn ModelWriter, frame: &TagFrame) -> Result<()> {
        let target = self.scope_name();
        let source_file = self.source_file.clone();
        let mut toolkit = Toolkit {
            compiler: self,
            items: &frame.items,
        };
        writer.process_custom_tag(&target, &frame.tag, &mut toolkit, &source_file)
    }
}

/// Helpers handed to [`ModelWriter::process_custom_tag`]
pub struct Toolkit<'a, 's> {
    compiler: &'a mut FileCompiler<'s>,
    items: &'a [Item],
}

impl<'a, 's> Toolkit<'a, 's> {
    /// The tag's body: text runs and nested tags
    pub fn items(&self) -> &'a [Item] {
        self.items
    }

    /// The body as trimmed text, if it is a single plain string
    pub fn text(&self) -> Option<String> {
        match self.items {
            [Item::Text(text)] => Some(text.trim().to_string()),
            _ => None,
        }
    }

    pub fn current_scope_name(&self) -> FdomName {
        self.compiler.scope_name()
    }

    pub fn source_file(&self) -> &str {
        &self.compiler.source_file
    }

    pub fn parse_name(&self, name: &str) -> Vec<String> {
        parse_name(name)
    }

    /// Resolve a parsed name the way `REF` would in the current scope
    pub fn resolve_parsed_name(&mut self, parsed: &[String]) -> FdomName {
        let id = self.compiler.lookup(parsed, false, true);
        self.compiler.full_name(id)
    }

    /// Process a nested item as if it appeared inline
    pub fn process_tag(&mut self, writer: &mut dyn ModelWriter, item: &Item) -> Result<()> {
        self.compiler.process_item(writer, item)
    }

    /// Report a recoverable problem with the tag
    pub fn warning(&mut self, code: &str, message: String) {
        self.compiler.warn(code, message);
    }
}

/// Percent-encode everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
fn encode_uri_component(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => encoded.push(byte as char),
            b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
