use std::path::PathBuf;

/// Errors that abort processing of a markup input file
///
/// Everything else (bad tags, missing includes, ...) is a diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MarkupError>;
