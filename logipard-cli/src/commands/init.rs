//! Init command implementation.

use anyhow::{Context, Result};
use logipard_core::DEFAULT_CONFIG_YAML;
use std::fs;
use std::path::Path;

/// Initialize a new logipard project
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    let config_path = root.join("logipard.yml");
    if config_path.exists() {
        println!("logipard.yml already exists at {:?}", config_path);
        return Ok(());
    }

    fs::write(&config_path, DEFAULT_CONFIG_YAML)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    println!("  - Point in_root_dir at your extracted *.lpinput files");
    println!("  - Run `logipard compile` to build the model");
    Ok(())
}
