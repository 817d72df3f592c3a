//! Dump command implementation.

use anyhow::{Context, Result};
use logipard_fdom::{Fdom, FdomItem, ReaderContent, ReaderFdom};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::path::Path;

/// Print the tree of a compiled model
pub fn dump_model(model_path: &Path, sources: bool, json: bool) -> Result<()> {
    let mut model = Fdom::new();
    model
        .load_from_file(model_path, false)
        .with_context(|| format!("Failed to load model {:?}", model_path))?;
    let reader = model.transform_for_reader(sources);

    if json {
        let members: Vec<Value> = reader
            .root()
            .members()
            .filter(|m| !m.is_null())
            .map(|m| item_json(&reader, m))
            .collect();
        println!("{}", serde_json::to_string_pretty(&members)?);
    } else {
        let mut out = String::new();
        for member in reader.root().members().filter(|m| !m.is_null()) {
            write_item(&reader, member, 0, &mut out);
        }
        print!("{}", out);
    }
    Ok(())
}

fn write_item(reader: &ReaderFdom, item: FdomItem<'_>, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let tags: Vec<String> = item.tags().map(|t| t.name().to_string()).collect();
    if tags.is_empty() {
        let _ = writeln!(out, "{}{}", indent, item.short_name());
    } else {
        let _ = writeln!(out, "{}{}  [{}]", indent, item.short_name(), tags.join(", "));
    }

    let text = content_text(reader, item);
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "{}  | {}", indent, line);
    }

    for member in item.members().filter(|m| !m.is_null()) {
        write_item(reader, member, depth + 1, out);
    }
}

fn content_text(reader: &ReaderFdom, item: FdomItem<'_>) -> String {
    let mut text = String::new();
    for content in item.content() {
        match content {
            ReaderContent::Text(value) => text.push_str(value),
            ReaderContent::SrcFile(file) => {
                let _ = write!(text, "\n@{}\n", file);
            }
            ReaderContent::Ref { target, text: display } => {
                let _ = write!(text, "[{} -> {}]", display, reader.get(*target).name());
            }
            ReaderContent::CustomTag(value) => {
                let name = value.get("name").and_then(Value::as_str).unwrap_or("?");
                let _ = write!(text, "<{}>", name);
            }
        }
    }
    text
}

fn item_json(reader: &ReaderFdom, item: FdomItem<'_>) -> Value {
    let content: Vec<Value> = item
        .content()
        .iter()
        .map(|content| match content {
            ReaderContent::Text(value) => json!({ "text": value }),
            ReaderContent::SrcFile(file) => json!({ "srcFile": file }),
            ReaderContent::Ref { target, text } => json!({
                "ref": reader.get(*target).name().to_string(),
                "text": text,
            }),
            ReaderContent::CustomTag(value) => json!({ "customTag": value }),
        })
        .collect();

    json!({
        "name": item.name().to_string(),
        "uid": item.uid(),
        "tags": item.tags().map(|t| t.name().to_string()).collect::<Vec<_>>(),
        "content": content,
        "members": item
            .members()
            .filter(|m| !m.is_null())
            .map(|m| item_json(reader, m))
            .collect::<Vec<_>>(),
    })
}
