//! Recoverable diagnostics
//!
//! Malformed markup never aborts a compile. Each problem is logged through
//! `tracing` and also recorded here so callers can report or inspect it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Warning,
    Info,
}

/// A diagnostic message attributed to a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Short dotted identifier, e.g. `markup.unmatched-closer`
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: DiagnosticSeverity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity,
            source_file: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Info, code, message)
    }

    pub fn with_source(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_file {
            Some(file) => write!(f, "{}: [{}] {}", file, self.code, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Collector for diagnostics
///
/// Every emitted diagnostic is also forwarded to `tracing`.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic message
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            DiagnosticSeverity::Warning => tracing::warn!("{}", diagnostic),
            DiagnosticSeverity::Info => tracing::info!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }

    /// Emit a warning attributed to `source_file`
    pub fn warning(&mut self, source_file: &str, code: &str, message: String) {
        self.emit(Diagnostic::warning(code, message).with_source(source_file));
    }

    /// Emit an informational message attributed to `source_file`
    pub fn info(&mut self, source_file: &str, code: &str, message: String) {
        self.emit(Diagnostic::info(code, message).with_source(source_file));
    }

    /// Get all diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True if a diagnostic with this code was emitted
    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }

    /// Move all collected diagnostics out, leaving the collector empty
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Append diagnostics collected elsewhere (already logged)
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }
}
