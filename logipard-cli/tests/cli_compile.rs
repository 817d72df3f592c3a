use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn write_project(root: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(root.join("extract/src"))?;
    fs::write(
        root.join("logipard.yml"),
        r#"
compile:
  - in_root_dir: extract
    out_file: gen/fdom.json
    extra_tags:
      note: text
"#,
    )?;
    fs::write(
        root.join("extract/src/lib.lpinput"),
        "<#LP lib {#><#LP ./parse %api: Parses input. See <#REF lib/emit: emit#>.#>\n<#LP ./emit %api: Emits output. <#note careful#>#>",
    )?;
    Ok(())
}

#[test]
fn compile_then_dump_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_project(dir.path())?;

    #[allow(deprecated)]
    Command::cargo_bin("logipard")?
        .current_dir(dir.path())
        .arg("compile")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files compiled"));
    assert!(dir.path().join("gen/fdom.json").exists());

    #[allow(deprecated)]
    let assert = Command::cargo_bin("logipard")?
        .current_dir(dir.path())
        .args(["dump", "gen/fdom.json", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let value: Value = serde_json::from_str(&stdout)?;
    let top = value.as_array().expect("json array");
    let lib = top.iter().find(|v| v["name"] == "lib").expect("lib item");
    let members = lib["members"].as_array().expect("members array");
    assert_eq!(members[0]["name"], "lib/parse");
    assert_eq!(members[0]["tags"][0], "%api");
    assert_eq!(members[0]["content"][1]["ref"], "lib/emit");
    assert_eq!(members[1]["content"][1]["customTag"]["text"], "careful");
    Ok(())
}

#[test]
fn dump_text_lists_tree() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_project(dir.path())?;

    #[allow(deprecated)]
    Command::cargo_bin("logipard")?
        .current_dir(dir.path())
        .arg("compile")
        .assert()
        .success();

    #[allow(deprecated)]
    Command::cargo_bin("logipard")?
        .current_dir(dir.path())
        .args(["dump", "gen/fdom.json", "--sources"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  parse  [%api]"))
        .stdout(predicate::str::contains("@src/lib.lpinput"))
        .stdout(predicate::str::contains("[emit -> lib/emit]"));
    Ok(())
}

#[test]
fn compile_reports_missing_item() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_project(dir.path())?;

    #[allow(deprecated)]
    Command::cargo_bin("logipard")?
        .current_dir(dir.path())
        .args(["compile", "--item", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn compile_fails_on_unreadable_input() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_project(dir.path())?;
    fs::write(dir.path().join("extract/bad.lpinput"), [0xffu8, 0xfe])?;

    #[allow(deprecated)]
    Command::cargo_bin("logipard")?
        .current_dir(dir.path())
        .arg("compile")
        .assert()
        .failure()
        .stdout(predicate::str::contains("error: bad.lpinput"));
    assert!(dir.path().join("gen/fdom.json").exists());
    Ok(())
}

#[test]
fn init_writes_config_once() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let target = dir.path().join("project");

    #[allow(deprecated)]
    Command::cargo_bin("logipard")?
        .arg("init")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    let config = fs::read_to_string(target.join("logipard.yml"))?;
    assert!(config.contains("in_root_dir"));

    #[allow(deprecated)]
    Command::cargo_bin("logipard")?
        .arg("init")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    Ok(())
}
