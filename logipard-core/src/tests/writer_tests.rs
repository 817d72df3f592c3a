use super::write_file;
use crate::config::{CompileItem, ExtraTagKind};
use crate::job::CompileJob;
use crate::json_writer::JsonModelWriter;
use crate::writer::ModelWriter;
use logipard_fdom::{Fdom, ReaderContent};
use logipard_types::FdomName;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn test_extra_tags_are_embedded() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("in");
    write_file(
        &root,
        "src/a.lpinput",
        "<#LP doc: Intro <#note  remember this #> <#IMG pic.png#> <#img /assets/logo.svg#> \
         <#img missing.png#> <#unknown x#> <#note <#b y#>#>#>",
    );
    std::fs::write(root.join("src/pic.png"), [1u8, 2, 3]).unwrap();
    write_file(dir.path(), "assets/logo.svg", "<svg/>");

    let mut item = CompileItem::new(&root, dir.path().join("out/fdom.json"));
    item.work_dir = dir.path().to_path_buf();
    item.extra_tags.insert("note".to_string(), ExtraTagKind::Text);
    item.extra_tags.insert("img".to_string(), ExtraTagKind::File);

    let report = CompileJob::new(item.clone()).run_to_json().unwrap();
    let codes: Vec<&str> = report.diagnostics.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(
        codes,
        vec![
            "custom-tag.file-unreadable",
            "custom-tag.unsupported",
            "custom-tag.not-plain",
        ]
    );

    let mut model = Fdom::new();
    model.load_from_file(&item.out_file, false).unwrap();
    let reader = model.transform_for_reader(false);
    let doc = reader.item("doc").unwrap();

    let custom: Vec<&serde_json::Value> = doc
        .content()
        .iter()
        .filter_map(|c| match c {
            ReaderContent::CustomTag(value) => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(
        custom,
        vec![
            &json!({ "name": "note", "text": "remember this" }),
            &json!({ "name": "img", "file": "data:image/png;base64,AQID" }),
            &json!({ "name": "img", "file": "data:image/svg+xml;base64,PHN2Zy8+" }),
        ]
    );
    assert!(doc.plain_text().starts_with("Intro "));
}

#[test]
fn test_close_without_open_fails() {
    let dir = tempdir().unwrap();
    let item = CompileItem::new(dir.path(), dir.path().join("fdom.json"));
    let mut writer = JsonModelWriter::new(&item);
    assert!(writer.close_model_output().is_err());

    writer.open_model_output().unwrap();
    writer
        .append_content(&FdomName::from_path("a"), "text", "a.lpinput")
        .unwrap();
    writer.close_model_output().unwrap();
    assert!(item.out_file.exists());
}

#[test]
fn test_corrupt_model_aborts_job() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "in/a.lpinput", "<#LP a: text#>");
    write_file(dir.path(), "fdom.json", "{ not json");

    let item = CompileItem::new(dir.path().join("in"), dir.path().join("fdom.json"));
    assert!(CompileJob::new(item).run_to_json().is_err());
}
