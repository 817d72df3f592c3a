//! # logipard-core
//!
//! Compile stage for logipard: turns extracted `*.lpinput` files into a
//! persisted FDOM.
//!
//! This crate provides name resolution against the scope stack, the
//! directive interpreter, the writer contract with its JSON-backed
//! implementation, and the job runner that ties them together.

pub mod compiler;
pub mod config;
pub mod error;
pub mod job;
pub mod json_writer;
pub mod name_tree;
pub mod resolver;
pub mod writer;

#[cfg(test)]
mod tests;

pub use compiler::{CompileSession, FileCompiler, Toolkit};
pub use config::{CompileItem, CompileItemConfig, Config, ConfigError, ExtraTagKind, DEFAULT_CONFIG_YAML};
pub use error::{CompileError, Result};
pub use job::{CompileJob, FileError, JobReport};
pub use json_writer::JsonModelWriter;
pub use name_tree::{NameId, NameKind, NameTree};
pub use resolver::{resolve_name, ScopeEntry};
pub use writer::ModelWriter;
