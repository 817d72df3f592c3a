//! Shared types for logipard
//!
//! This crate provides the vocabulary used across the logipard crates:
//! FDOM names and the diagnostics collected while parsing and compiling
//! markup.

mod diagnostics;
mod name;

pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticSeverity};
pub use name::{is_updir_segment, FdomName};
