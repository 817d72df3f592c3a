//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Main configuration struct matching the logipard.yml schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Compile stage items, processed in order
    #[serde(default)]
    pub compile: Vec<CompileItemConfig>,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

/// How the FDOM writer stores a custom tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraTagKind {
    /// Body is kept as trimmed text
    Text,
    /// Body names a file, embedded as a data URL
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileItemConfig {
    /// Directory holding the extracted `*.lpinput` files
    pub in_root_dir: PathBuf,

    /// Model JSON file to read and update
    pub out_file: PathBuf,

    #[serde(default = "default_lookup_dir_name")]
    pub lp_inc_lookup_dir_name: String,

    #[serde(default)]
    pub extra_tags: BTreeMap<String, ExtraTagKind>,

    #[serde(default)]
    pub skip: bool,

    /// Regexes matched against root-relative input paths
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_lookup_dir_name() -> String {
    logipard_markup::DEFAULT_LOOKUP_DIR_NAME.to_string()
}

/// A compile item with every path resolved
#[derive(Debug, Clone)]
pub struct CompileItem {
    pub in_root_dir: PathBuf,
    pub out_file: PathBuf,
    pub lookup_dir_name: String,
    pub extra_tags: BTreeMap<String, ExtraTagKind>,
    pub skip: bool,
    pub ignore_patterns: Vec<String>,
    /// Project directory; `file` tags with a leading `/` resolve against it
    pub work_dir: PathBuf,
}

impl CompileItem {
    /// Item with defaults for everything but the two paths
    pub fn new(in_root_dir: impl Into<PathBuf>, out_file: impl Into<PathBuf>) -> Self {
        let in_root_dir = in_root_dir.into();
        Self {
            work_dir: in_root_dir.clone(),
            in_root_dir,
            out_file: out_file.into(),
            lookup_dir_name: default_lookup_dir_name(),
            extra_tags: BTreeMap::new(),
            skip: false,
            ignore_patterns: Vec::new(),
        }
    }
}

/// Starter configuration written by `logipard init`
pub const DEFAULT_CONFIG_YAML: &str = r#"# logipard configuration
compile:
  - in_root_dir: lp-extract.gen
    out_file: lp-compile.gen/fdom.json
    lp_inc_lookup_dir_name: lp-includes
    extra_tags:
      note: text
    skip: false
"#;

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration from YAML text; paths stay relative to the cwd
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Directory of the config file, the project's work dir
    pub fn work_dir(&self) -> PathBuf {
        self.config_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Compile items with paths resolved relative to the config file
    pub fn compile_items(&self) -> Vec<CompileItem> {
        self.compile
            .iter()
            .map(|item| CompileItem {
                in_root_dir: self.resolve_path(&item.in_root_dir),
                out_file: self.resolve_path(&item.out_file),
                lookup_dir_name: item.lp_inc_lookup_dir_name.clone(),
                extra_tags: item
                    .extra_tags
                    .iter()
                    .map(|(name, kind)| (name.to_lowercase(), *kind))
                    .collect(),
                skip: item.skip,
                ignore_patterns: item.ignore_patterns.clone(),
                work_dir: self.work_dir(),
            })
            .collect()
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }
}
